use std::fs;
use std::path::{Path, PathBuf};

use cl_bitfinder::PipelineError;
use cl_bitfinder::kernel_source::{FRAGMENTS, load};

struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "cl-bitfinder-{tag}-{}-{:x}",
            std::process::id(),
            rand::random::<u64>()
        ));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn write_bundle(dir: &Path) {
    for (i, name) in FRAGMENTS.iter().enumerate() {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body = format!(
            "#include \"inc_vendor.h\"\n// fragment {i}\nDECLSPEC void f{i} (GLOBAL_AS const secp256k1_t *tmps);\n"
        );
        fs::write(path, body).unwrap();
    }
}

#[test]
fn loads_fragments_in_bundle_order() {
    let scratch = ScratchDir::new("order");
    write_bundle(scratch.path());

    let sources = load(scratch.path()).unwrap();
    assert_eq!(sources.len(), FRAGMENTS.len());
    for (i, src) in sources.iter().enumerate() {
        assert!(src.contains(&format!("// fragment {i}\n")), "{src}");
    }
}

#[test]
fn loaded_fragments_are_normalized() {
    let scratch = ScratchDir::new("normalized");
    write_bundle(scratch.path());

    for src in load(scratch.path()).unwrap() {
        assert!(!src.contains("#include"));
        assert!(!src.contains("GLOBAL_AS"));
        assert!(src.starts_with('\n'));
        assert!(src.contains("(const secp256k1_t *tmps)"));
    }
}

#[test]
fn missing_fragment_names_the_path() {
    let scratch = ScratchDir::new("missing");
    write_bundle(scratch.path());
    let victim = scratch.path().join(FRAGMENTS[9]);
    fs::remove_file(&victim).unwrap();

    match load(scratch.path()) {
        Err(PipelineError::KernelSource { path, .. }) => assert_eq!(path, victim),
        other => panic!("expected KernelSource error, got {other:?}"),
    }
}

#[test]
fn bundle_starts_with_defines_and_ends_with_ripemd_kernels() {
    assert_eq!(FRAGMENTS[0], "inc_defines.h");
    assert_eq!(FRAGMENTS[FRAGMENTS.len() - 1], "generate_btc_ripemd160.cl");
    let ecc = FRAGMENTS.iter().position(|f| f.ends_with("inc_ecc_secp256k1.cl")).unwrap();
    let custom = FRAGMENTS.iter().position(|f| *f == "inc_ecc_secp256k1custom.cl").unwrap();
    assert!(ecc < custom);
}
