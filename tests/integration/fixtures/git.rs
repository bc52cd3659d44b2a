use std::path::Path;

use git2::{Oid, Repository, Signature};

pub fn init_bare_repo(path: &Path) -> Result<(), String> {
    Repository::init_bare(path)
        .map_err(|err| format!("git init --bare failed for {path:?}: {err}"))?;
    Ok(())
}

pub fn init_repo(path: &Path) -> Result<Repository, String> {
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(path, &opts)
        .map_err(|err| format!("git init failed for {path:?}: {err}"))?;
    configure_test_repo(&repo)?;
    Ok(repo)
}

/// Commit one file at the current wall-clock time, like a person would.
pub fn commit_file(repo: &Repository, name: &str, contents: &str) -> Result<Oid, String> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| "bare repository has no workdir".to_string())?;
    std::fs::write(workdir.join(name), contents)
        .map_err(|err| format!("write {name} failed: {err}"))?;
    let mut index = repo.index().map_err(|err| format!("index: {err}"))?;
    index
        .add_path(Path::new(name))
        .map_err(|err| format!("add {name}: {err}"))?;
    index.write().map_err(|err| format!("index write: {err}"))?;
    let tree_oid = index.write_tree().map_err(|err| format!("write tree: {err}"))?;
    let tree = repo
        .find_tree(tree_oid)
        .map_err(|err| format!("find tree: {err}"))?;
    let sig = Signature::now("Test", "test@test.com").map_err(|err| format!("sig: {err}"))?;
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "manual commit", &tree, &parents)
        .map_err(|err| format!("commit: {err}"))
}

pub fn branch_tip(repo_dir: &Path, branch: &str) -> Result<Option<Oid>, String> {
    let repo = Repository::open(repo_dir)
        .map_err(|err| format!("open repo failed for {repo_dir:?}: {err}"))?;
    let refname = format!("refs/heads/{branch}");
    Ok(repo.find_reference(&refname).ok().and_then(|r| r.target()))
}

/// First-parent commit count from HEAD.
pub fn commit_count(repo_dir: &Path) -> Result<usize, String> {
    let repo = Repository::open(repo_dir)
        .map_err(|err| format!("open repo failed for {repo_dir:?}: {err}"))?;
    let mut walk = repo.revwalk().map_err(|err| format!("revwalk: {err}"))?;
    walk.simplify_first_parent()
        .map_err(|err| format!("simplify: {err}"))?;
    walk.push_head().map_err(|err| format!("push head: {err}"))?;
    Ok(walk.count())
}

fn configure_test_repo(repo: &Repository) -> Result<(), String> {
    let mut cfg = repo
        .config()
        .map_err(|err| format!("open repo config failed: {err}"))?;
    cfg.set_str("user.name", "Test")
        .map_err(|err| format!("set user.name failed: {err}"))?;
    cfg.set_str("user.email", "test@test.com")
        .map_err(|err| format!("set user.email failed: {err}"))?;
    Ok(())
}
