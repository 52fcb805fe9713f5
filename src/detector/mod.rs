pub mod alerts;
pub mod movement;

pub use movement::{Movement, MovementModel};
