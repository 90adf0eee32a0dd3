//! Extracts still frames from every video in a folder tree.
//!
//! The [`walker`] finds the videos, the [`sampler`] picks which frames to take from each
//! of them, and the [`layout`] decides what the resulting images are called. Videos are
//! read, and images written, through the traits in [`video`].

pub mod config;
pub mod frame_extractor;
pub mod layout;
pub mod sampler;
pub mod summary;
pub mod video;
pub mod walker;
