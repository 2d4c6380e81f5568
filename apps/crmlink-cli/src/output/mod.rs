//! Terminal output helpers

mod printer;

pub use printer::{
    format_token, use_color, write_header, write_key_value, write_success, write_warning,
};
