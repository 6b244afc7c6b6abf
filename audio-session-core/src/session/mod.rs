pub mod capture;
pub mod context;
pub mod manager;
pub mod routing;
