//! twilight-boxart - box art for TWiLight Menu++
//!
//! Identifies ROMs by their SHA-1 against the No-Intro catalogs, falls back
//! to fuzzy file-name matching, and fetches matching box art from
//! libretro-thumbnails.

pub mod asset_key;
pub mod catalog;
pub mod config;
pub mod console;
pub mod container;
pub mod fetch;
pub mod hash;
pub mod http;
pub mod names;
pub mod pipeline;
pub mod rename;
pub mod report;
pub mod resolver;
pub mod scan;
pub mod thumbnail;
