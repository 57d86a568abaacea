pub mod inventory;
pub mod stamp;
