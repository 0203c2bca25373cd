//! HTTP implementation of the upload transport.
//!
//! [`RestClient`] speaks the server's REST surface over reqwest and
//! plugs into `portage_upload::UploadEngine` through the
//! `ServerTransport` trait.

pub mod client;
mod multipart;

pub use client::RestClient;
