pub mod contract;
pub mod error;
pub mod execute;
pub mod msg;
pub mod query;
pub mod state;
pub mod typed_data;

pub use contract::SignatureMinting;
pub use error::ContractError;
pub use typed_data::MintRequestVariant;
