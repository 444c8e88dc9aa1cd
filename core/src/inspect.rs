//! Inspection runner (spec §4.10): executes each inspection's `run` command
//! locally, in the verifier's own working directory, and records its own
//! link — never signature-checked, since the verifier produced it itself.

use std::time::Duration;

use crate::error::{InTotoError, Result};
use crate::model::{Byproducts, Inspection, Link};
use crate::process;
use crate::resolver::{self, ResolverOptions};

/// Run one inspection's command and build its link, per spec §4.10:
/// materials are resolved before execution, products after, both against
/// the current directory with default resolver options.
pub fn run_inspection(inspection: &Inspection, timeout: Option<Duration>) -> Result<Link> {
    let opts = ResolverOptions::default();
    let materials = resolver::resolve_all(&[".".to_string()], &opts)?;

    let result = process::execute(&inspection.run, None, timeout, true)?;

    if result.return_value != 0 {
        return Err(InTotoError::BadReturnValueError {
            name: inspection.name.clone(),
            detail: format!("exit status {}", result.return_value),
        });
    }

    let products = resolver::resolve_all(&[".".to_string()], &opts)?;

    let mut link = Link::new(inspection.name.clone());
    link.materials = materials.into_iter().collect();
    link.products = products.into_iter().collect();
    link.command = inspection.run.clone();
    link.byproducts = Byproducts {
        stdout: result.stdout,
        stderr: result.stderr,
        return_value: result.return_value,
    };
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_inspection_produces_a_link() {
        let inspection = Inspection {
            type_: "inspection".to_string(),
            name: "check".to_string(),
            expected_materials: Vec::new(),
            expected_products: Vec::new(),
            run: vec!["true".to_string()],
        };
        let link = run_inspection(&inspection, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(link.name, "check");
        assert_eq!(link.byproducts.return_value, 0);
    }

    #[test]
    fn failing_inspection_errors() {
        let inspection = Inspection {
            type_: "inspection".to_string(),
            name: "check".to_string(),
            expected_materials: Vec::new(),
            expected_products: Vec::new(),
            run: vec!["false".to_string()],
        };
        let result = run_inspection(&inspection, Some(Duration::from_secs(5)));
        assert!(matches!(result, Err(InTotoError::BadReturnValueError { .. })));
    }
}
