mod api;
mod app;
mod camera;
mod config;
mod controller;
mod dom;
mod draft;
mod map;
mod mapbox;
mod source_sync;
mod store;

pub use app::run;
