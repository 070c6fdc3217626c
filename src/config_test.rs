use super::*;

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = SimulationConfig::load(std::path::Path::new("/nonexistent/path/config.toml")).unwrap();
    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn partial_toml_fills_remaining_fields_from_defaults() {
    let dir = std::env::temp_dir().join(format!("simplex_consensus_config_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    std::fs::write(&path, "node_count = 7\nblank_block_timeout = 99\n").unwrap();

    let config = SimulationConfig::load(&path).unwrap();
    assert_eq!(config.node_count, 7);
    assert_eq!(config.node.blank_block_timeout, 99);
    assert_eq!(config.generate_blocks, SimulationConfig::default().generate_blocks);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn node_timings_mirrors_the_node_config_section() {
    let mut config = SimulationConfig::default();
    config.node.blank_block_timeout = 42;
    let timings = config.node_timings();
    assert_eq!(timings.blank_block_timeout, 42);
    assert_eq!(timings.chain_update_timeout, config.node.chain_update_timeout);
}
