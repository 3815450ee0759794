mod catalog;
mod definition;

pub use catalog::ProtocolCatalog;
pub use definition::BreathingProtocol;
