mod address_mapper;
mod distribution;

pub use address_mapper::PatternAddressMapper;
pub use distribution::RowDistance;
