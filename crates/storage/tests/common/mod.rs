pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{read_all, seeded_bytes, temp_backend};
