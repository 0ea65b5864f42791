use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const SEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sv:node xmlns:sv="http://www.jcp.org/jcr/sv/1.0" xmlns:jcr="http://www.jcp.org/jcr/1.0" sv:name="content">
  <sv:property sv:name="jcr:primaryType" sv:type="Name"><sv:value>nt:unstructured</sv:value></sv:property>
  <sv:property sv:name="owner" sv:type="String"><sv:value>ops</sv:value></sv:property>
  <sv:node sv:name="rep:policy">
    <sv:property sv:name="jcr:primaryType" sv:type="Name"><sv:value>rep:ACL</sv:value></sv:property>
  </sv:node>
  <sv:node sv:name="site">
    <sv:property sv:name="jcr:primaryType" sv:type="Name"><sv:value>nt:unstructured</sv:value></sv:property>
    <sv:property sv:name="title" sv:type="String"><sv:value>Home</sv:value></sv:property>
  </sv:node>
</sv:node>
"#;

pub const REPLACEMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fresh xmlns:jcr="http://www.jcp.org/jcr/1.0" jcr:primaryType="nt:unstructured" title="Fresh"/>
"#;

/// A scratch local repository plus the command line that points `jack` at it.
pub struct Scratch {
    pub dir: tempfile::TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    pub fn jack(&self, command: &str, file: &Path, overrides: &[&str]) -> Output {
        base_cmd()
            .arg(command)
            .arg(file)
            .arg(format!("jackrabbit-home={}", self.path("home").display()))
            .arg(format!(
                "jackrabbit-config={}",
                self.path("repository.toml").display()
            ))
            .args(overrides)
            .output()
            .expect("run jack")
    }
}

pub fn base_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jack"));
    cmd.env("DOTENV_PATH", "/nonexistent/.env")
        .env("RUST_LOG", "info")
        .env_remove("JACK_PROPERTIES")
        .env_remove("JACK_LOG_FILE");
    cmd
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
