pub mod budget;
pub mod customer;
