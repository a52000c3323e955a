pub mod fade;

pub use fade::FadeIn;
