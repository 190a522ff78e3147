pub mod downsampling;
