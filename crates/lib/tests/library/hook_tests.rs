use packline_lib::driver::build;
use packline_lib::hook::{AssetHook, HostLoaders, RAW_LOADER, read_host_config, write_host_config};
use serde_json::{Value, json};

use super::common::{Project, options};

const CSS: &str = "body{color:red}\n/* \"quoted\" */\n";

#[test]
fn hook_edits_host_config_on_disk() {
  let project = Project::new();
  project.write(
    "host.json",
    r#"{"mode": "development", "module": {"rules": [{"test": "\\.svg$", "loader": "file-loader"}]}}"#,
  );

  let path = project.path("host.json");
  let config = AssetHook::default().apply(read_host_config(&path).unwrap());
  write_host_config(&path, &config).unwrap();

  let written: Value = serde_json::from_str(&project.read("host.json")).unwrap();
  assert_eq!(written["mode"], "development");
  assert_eq!(
    written["module"]["rules"],
    json!([
      {"test": "\\.svg$", "loader": "file-loader"},
      {"test": "\\.css$", "loader": "raw-loader"}
    ])
  );
}

#[tokio::test]
async fn hook_and_string_stage_agree_on_css_text() {
  let project = Project::new();
  project
    .write("src/site.css", CSS)
    .write("src/index.js", "module.exports = require('./site.css');\n");

  let loaders = HostLoaders::from_config(&AssetHook::default().apply(Default::default())).unwrap();
  let asset = loaders.load(&project.path("src/site.css")).unwrap();
  assert_eq!(asset.loader, RAW_LOADER);
  let literal = asset
    .source
    .strip_prefix("export default ")
    .and_then(|rest| rest.strip_suffix(";\n"))
    .unwrap()
    .to_string();
  assert_eq!(serde_json::from_str::<String>(&literal).unwrap(), CSS);

  let config = project.config(&[("resolve", Value::Null), ("string", Value::Null)]);
  build(&config, &options()).await.unwrap();
  assert!(project.read("dist/index.js").contains(&format!("module.exports = {};", literal)));
}
