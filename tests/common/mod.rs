//! Shared test harness: a sandboxed project and a fake tool runner.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use wheel_bundler::bundler::{
    CommandOutput, CommandRunner, Invocation, PythonVersion, RepairTool, Result, SettingsBuilder,
};

pub const VERSION: &str = "3.9.1";
pub const WHEEL: &str = "ssh2_python-0.27.0-cp39-cp39-macosx_10_9_x86_64.whl";
pub const REPAIRED_WHEEL: &str = "ssh2_python-0.27.0-cp39-cp39-manylinux_2_17_x86_64.whl";

/// Temporary project tree, pyenv root, library dir and output dir.
pub struct Sandbox {
    _root: TempDir,
    pub project: PathBuf,
    pub pyenv_root: PathBuf,
    pub lib_dir: PathBuf,
    pub output: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("ssh2-python");
        let pyenv_root = root.path().join("pyenv");
        let lib_dir = root.path().join("usr-local-lib");
        let output = project.join("wheels");

        std::fs::create_dir_all(project.join("ssh2")).unwrap();
        std::fs::write(project.join("setup.py"), "from setuptools import setup\n").unwrap();
        std::fs::write(project.join("requirements.txt"), "cython\nsetuptools-scm\n").unwrap();
        std::fs::write(project.join("ssh2").join("session.c"), "/* ext */\n").unwrap();
        std::fs::create_dir_all(&pyenv_root).unwrap();
        std::fs::create_dir_all(&lib_dir).unwrap();
        std::fs::write(lib_dir.join("libssh2.1.dylib"), b"dylib").unwrap();
        std::fs::create_dir_all(&output).unwrap();

        Self {
            _root: root,
            project,
            pyenv_root,
            lib_dir,
            output,
        }
    }

    /// Marks the interpreter as already installed.
    pub fn preinstall(&self) {
        let bin = self.pyenv_root.join("versions").join(VERSION).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), b"").unwrap();
    }

    pub fn settings(&self) -> SettingsBuilder {
        SettingsBuilder::new()
            .python_version(PythonVersion::parse(VERSION).unwrap())
            .pyenv_root(&self.pyenv_root)
            .project_dir(&self.project)
            .native_library(format!("{}/libssh2*", self.lib_dir.display()))
            .repair_tool(RepairTool::Delocate)
            .smoke_import("ssh2.session")
    }

    pub fn wheels_in(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "whl"))
                    .collect()
            })
            .unwrap_or_default();
        found.sort();
        found
    }
}

/// Writes a minimal wheel archive with the given entries.
pub fn write_wheel(path: &Path, entries: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for entry in entries {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(b"\0").unwrap();
    }
    zip.finish().unwrap();
}

fn wheel_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Simulates pyenv, venv, pip, delocate and auditwheel on the filesystem
/// and records every invocation.
pub struct FakeRunner {
    pyenv_root: PathBuf,
    calls: Mutex<Vec<Invocation>>,
    smoke_dirs: Mutex<Vec<(PathBuf, bool)>>,
    fail_when: Option<(String, i32)>,
    delocate_bundles: bool,
}

impl FakeRunner {
    pub fn new(pyenv_root: &Path) -> Self {
        Self {
            pyenv_root: pyenv_root.to_path_buf(),
            calls: Mutex::new(Vec::new()),
            smoke_dirs: Mutex::new(Vec::new()),
            fail_when: None,
            delocate_bundles: true,
        }
    }

    /// Makes any command whose rendering contains `needle` exit with `code`.
    pub fn failing_on(mut self, needle: &str, code: i32) -> Self {
        self.fail_when = Some((needle.to_string(), code));
        self
    }

    /// Makes `delocate-wheel` succeed without embedding anything.
    pub fn without_bundling(mut self) -> Self {
        self.delocate_bundles = false;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }

    /// Working directories of smoke imports and whether they were empty.
    pub fn smoke_dirs(&self) -> Vec<(PathBuf, bool)> {
        self.smoke_dirs.lock().unwrap().clone()
    }

    fn simulate(&self, inv: &Invocation, args: &[String]) -> CommandOutput {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();

        match (inv.program_name().as_str(), arg(0)) {
            ("pyenv", "root") => CommandOutput::success(format!("{}\n", self.pyenv_root.display())),
            ("pyenv", "install") => {
                let bin = self.pyenv_root.join("versions").join(arg(1)).join("bin");
                std::fs::create_dir_all(&bin).unwrap();
                std::fs::write(bin.join("python"), b"").unwrap();
                CommandOutput::success("")
            }
            ("python", "-m") if arg(1) == "venv" => {
                let bin = PathBuf::from(args.last().unwrap()).join("bin");
                std::fs::create_dir_all(&bin).unwrap();
                std::fs::write(bin.join("python"), b"").unwrap();
                CommandOutput::success("")
            }
            ("python", "setup.py") => {
                let dist = PathBuf::from(arg(3));
                std::fs::create_dir_all(&dist).unwrap();
                write_wheel(
                    &dist.join(WHEEL),
                    &["ssh2/__init__.py", "ssh2/session.cpython-39-darwin.so"],
                );
                CommandOutput::success("")
            }
            ("python", "-m") if arg(1) == "pip" && arg(2) == "wheel" => {
                let dist = PathBuf::from(arg(5));
                std::fs::create_dir_all(&dist).unwrap();
                write_wheel(&dist.join(WHEEL), &["ssh2/__init__.py"]);
                CommandOutput::success("")
            }
            ("python", "-c") => {
                let cwd = inv.get_current_dir().unwrap().to_path_buf();
                let empty = std::fs::read_dir(&cwd).unwrap().next().is_none();
                self.smoke_dirs.lock().unwrap().push((cwd, empty));
                CommandOutput::success("")
            }
            ("delocate-listdeps", _) => {
                let bundled = wheel_entries(Path::new(arg(0)))
                    .iter()
                    .any(|e| e.contains(".dylibs/"));
                if bundled {
                    CommandOutput::success("ssh2/.dylibs/libssh2.1.dylib\n")
                } else {
                    CommandOutput::success("/usr/local/lib/libssh2.1.dylib\n")
                }
            }
            ("delocate-wheel", _) => {
                if self.delocate_bundles {
                    let wheel = PathBuf::from(arg(1));
                    let mut entries = wheel_entries(&wheel);
                    entries.push("ssh2/.dylibs/libssh2.1.dylib".to_string());
                    let entries: Vec<&str> = entries.iter().map(String::as_str).collect();
                    write_wheel(&wheel, &entries);
                }
                CommandOutput::success("")
            }
            ("auditwheel", "repair") => {
                let out = PathBuf::from(arg(3));
                std::fs::create_dir_all(&out).unwrap();
                write_wheel(
                    &out.join(REPAIRED_WHEEL),
                    &["ssh2/__init__.py", "ssh2_python.libs/libssh2-5f0a1b2c.so.1"],
                );
                CommandOutput::success("")
            }
            _ => CommandOutput::success(""),
        }
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some((needle, code)) = &self.fail_when {
            if invocation.to_string().contains(needle.as_str()) {
                return Ok(CommandOutput::failure(*code, format!("{needle}: simulated failure")));
            }
        }

        let args: Vec<String> = invocation
            .get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        Ok(self.simulate(invocation, &args))
    }
}
