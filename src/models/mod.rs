pub mod assignment;
pub mod driver;
pub mod order;
pub mod staff;
