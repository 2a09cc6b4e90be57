pub mod compute;
pub mod consts;
pub mod deconvolution;
pub mod error;
pub mod filters;
pub mod io;
pub mod kernel;
pub mod pipeline;
pub mod raster;
