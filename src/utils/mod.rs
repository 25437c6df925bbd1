pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{flatten_cell_text, is_usable_text, safe_truncate_chars};
pub use url_utils::{category_name, normalize_product_url, result_file_name, upscale_image_url};
