pub mod backend;
pub mod constants;
pub mod dispatcher;
pub mod fits;
pub mod fits_writer;
pub mod render;
