//! Data model (spec §3): the shapes exchanged on the wire, independent of
//! how they are verified or produced.

pub mod container;
pub mod inspection;
pub mod key;
pub mod layout;
pub mod link;
pub mod step;

pub use container::{Payload, SignedContainer};
pub use inspection::Inspection;
pub use key::{KeyVal, PublicKey};
pub use layout::Layout;
pub use link::{Byproducts, HashDict, Link};
pub use step::Step;
