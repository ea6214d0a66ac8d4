use figment::Jail;
use capstone_config::CapstoneConfig;

#[test]
fn env_overrides_nested_fields() {
    Jail::expect_with(|jail| {
        jail.set_env("CAPSTONE_WORKFLOW__TEAM_CAPACITY", "4");
        jail.set_env("CAPSTONE_DATABASE__PATH", "/tmp/capstone-env.db");

        let config = CapstoneConfig::load().expect("config loads");
        assert_eq!(config.workflow.team_capacity, 4);
        assert_eq!(config.database.path, "/tmp/capstone-env.db");
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".capstone")?;
        jail.create_file(
            ".capstone/config.toml",
            "[workflow]\ninvitation_ttl_secs = 100\n",
        )?;
        jail.set_env("CAPSTONE_WORKFLOW__INVITATION_TTL_SECS", "200");

        let config = CapstoneConfig::load().expect("config loads");
        assert_eq!(config.workflow.invitation_ttl_secs, 200);
        Ok(())
    });
}
