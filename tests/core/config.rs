// Configuration loading from files and the environment

use lexport::core::config::Config;
use lexport::core::xdg::XdgDirs;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: [&str; 7] = [
    "LEXPORT_CONFIG",
    "LEXPORT_DATA_DIR",
    "LEXPORT_LISTEN",
    "LEXPORT_MAX_FRAME_BYTES",
    "LEXPORT_DEFAULT_STEMMER",
    "LEXPORT_MAX_PAGE_SIZE",
    "LEXPORT_MAX_QUERY_DEPTH",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn xdg(temp: &TempDir) -> XdgDirs {
    XdgDirs {
        config_dir: temp.path().join("config"),
        data_dir: temp.path().join("data"),
    }
}

#[test]
#[serial]
fn test_xdg_config_file_is_used() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let dirs = xdg(&temp);
    fs::create_dir_all(&dirs.config_dir).unwrap();
    fs::write(
        dirs.config_file(),
        r#"
[server]
listen = "0.0.0.0:7000"

[engine]
default_stemmer = "english"

[limits]
max_page_size = 25
"#,
    )
    .unwrap();

    let config = Config::load_with_xdg(&dirs).unwrap();
    assert_eq!(config.server.listen, "0.0.0.0:7000");
    assert_eq!(config.engine.default_stemmer, "english");
    assert_eq!(config.limits.max_page_size, 25);
    // Unset sections keep their defaults
    assert_eq!(config.limits.max_query_depth, 64);
    assert_eq!(config.engine.data_dir, dirs.indexes_dir());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.toml");
    fs::write(&path, "[limits]\nmax_page_size = 25\nmax_query_depth = 8\n").unwrap();

    env::set_var("LEXPORT_CONFIG", &path);
    env::set_var("LEXPORT_MAX_PAGE_SIZE", "500");
    env::set_var("LEXPORT_DATA_DIR", temp.path().join("indexes"));
    env::set_var("LEXPORT_LISTEN", "127.0.0.1:9999");

    let config = Config::load_with_xdg(&xdg(&temp));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.limits.max_page_size, 500);
    assert_eq!(config.limits.max_query_depth, 8);
    assert_eq!(config.engine.data_dir, temp.path().join("indexes"));
    assert_eq!(config.server.listen, "127.0.0.1:9999");
}

#[test]
#[serial]
fn test_data_dir_env_names_the_index_directory() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let dirs = xdg(&temp);
    let indexes = temp.path().join("my-indexes");
    env::set_var("LEXPORT_DATA_DIR", &indexes);

    let config = Config::load_with_xdg(&dirs);
    clear_env();

    // Used as given, not as a root for an indexes/ subdirectory
    assert_eq!(config.unwrap().engine.data_dir, indexes);
    assert_eq!(dirs.indexes_dir(), temp.path().join("data").join("indexes"));
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");

    fs::write(&path, "[engine]\ndefault_stemmer = \"klingon\"\n").unwrap();
    env::set_var("LEXPORT_CONFIG", &path);
    assert!(Config::load_with_xdg(&xdg(&temp)).is_err());

    fs::write(&path, "[limits]\nmax_page_size = 0\n").unwrap();
    assert!(Config::load_with_xdg(&xdg(&temp)).is_err());

    fs::write(&path, "[server\nbroken").unwrap();
    let err = Config::load_with_xdg(&xdg(&temp)).unwrap_err();
    assert!(err.to_string().starts_with("TOML parsing error"));

    env::set_var("LEXPORT_CONFIG", temp.path().join("missing.toml"));
    assert!(Config::load_with_xdg(&xdg(&temp)).is_err());
    clear_env();
}

#[test]
fn test_config_serializes_back_to_toml() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.server.max_frame_bytes, config.server.max_frame_bytes);
    assert_eq!(parsed.engine.data_dir, config.engine.data_dir);
    assert!(parsed.validate().is_ok());
}
