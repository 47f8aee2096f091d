pub mod coin;
pub(crate) mod fees;
pub mod native;
pub mod token;
pub mod wallet;
