pub mod config;
pub mod interchange;
pub mod song;
pub mod studio;
pub mod synth;
pub mod time;
pub mod wave;
