pub mod date_converter;
pub mod grn_import;
