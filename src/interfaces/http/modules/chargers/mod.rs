pub mod handlers;

pub use handlers::ChargerApiState;
