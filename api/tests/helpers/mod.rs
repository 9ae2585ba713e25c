#![allow(dead_code)] // each test binary uses a different subset of helpers

pub mod app;
pub mod ws;

pub use app::{get_json, make_test_app, post_json, register_user, unread_count};
pub use ws::{assert_silent, connect_ws, recv_event, recv_text, spawn_server};
