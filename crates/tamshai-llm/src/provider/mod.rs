pub mod claude;
pub mod echo;
