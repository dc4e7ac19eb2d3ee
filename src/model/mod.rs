mod figure;
mod hdu;
mod header;

pub use figure::*;
pub use hdu::{Hdu, HduList};
pub use header::HduHeader;
