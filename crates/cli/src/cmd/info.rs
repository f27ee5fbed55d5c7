use packline_lib::config::default_config_path;
use packline_lib::consts::{APP_NAME, CONFIG_ENV};
use packline_lib::stage::StageRegistry;

use crate::output::print_stat;

pub fn cmd_info() {
  println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
  print_stat("config", &default_config_path().display().to_string());
  print_stat("config override", &format!("${}", CONFIG_ENV));
  print_stat("stages", &StageRegistry::builtin().names().join(", "));
}
