//! Icon resources: format sniffing and icon set normalization.

pub mod icons;
pub mod image_meta;
