//! Cross-thread behavior of the repository and the gate.

use confsync_core::{CoreError, CoreResult, Gate, Release, Repository};
use confsync_protocol::{Content, Path, Target};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PATHS: usize = 8;
const ROUNDS: u64 = 200;

fn entry(index: usize, version: u64) -> (Path, Target, Content) {
    let path = Path::parse(&format!("datadog/2/ASM_DD/rule-{}/config", index)).unwrap();
    let content = Content::new(path.clone(), format!("{}:{}", index, version).into_bytes());
    let target = Target::new(
        content.length(),
        content.hashes().iter().map(|(a, h)| (a.clone(), h.clone())),
    )
    .with_custom(serde_json::json!({ "v": version }));
    (path, target, content)
}

fn replace_all(repository: &Repository, version: u64) -> CoreResult<()> {
    repository.transaction(|current, txn| {
        for path in current.paths() {
            txn.delete(path.clone());
        }
        for index in 0..PATHS {
            let (path, target, content) = entry(index, version);
            txn.insert(path, target, content);
        }
        txn.set_targets_version(version);
        Ok::<_, CoreError>(())
    })?;
    Ok(())
}

#[test]
fn readers_never_see_a_partial_commit() {
    let repository = Arc::new(Repository::new());
    replace_all(&repository, 1).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let repository = Arc::clone(&repository);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = 0u64;
                while !done.load(Ordering::SeqCst) {
                    let state = repository.state();
                    assert_eq!(state.len(), PATHS);
                    for path in state.paths() {
                        assert_eq!(state.get(path).unwrap().version(), state.targets_version());
                    }
                    assert!(state.targets_version() >= seen);
                    seen = state.targets_version();
                }
            })
        })
        .collect();

    for version in 2..=ROUNDS {
        replace_all(&repository, version).unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(repository.state().targets_version(), ROUNDS);
    assert_eq!(repository.commits(), ROUNDS);
}

#[test]
fn failed_commit_keeps_previous_snapshot() {
    let repository = Repository::new();
    replace_all(&repository, 1).unwrap();
    let before = repository.state();

    let result = repository.transaction(|_, txn| {
        let (path, target, content) = entry(0, 2);
        // Path is already applied, so the insert fails at commit.
        txn.insert(path, target, content);
        txn.set_targets_version(2);
        Ok::<_, CoreError>(())
    });

    assert!(matches!(result, Err(CoreError::AlreadyApplied { .. })));
    assert_eq!(*repository.state(), *before);
    assert_eq!(repository.commits(), 1);
}

#[test]
fn one_lift_releases_every_waiter() {
    let gate = Arc::new(Gate::new());
    let waiters: Vec<_> = (0..5)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_next_for(Duration::from_secs(10)))
        })
        .collect();

    while gate.waiters() < 5 {
        thread::sleep(Duration::from_millis(1));
    }
    gate.lift();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Release::Lifted);
    }
    assert_eq!(gate.waiters(), 0);
}

#[test]
fn lift_between_generation_read_and_wait_is_kept() {
    let gate = Arc::new(Gate::new());
    let observed = gate.generation();

    let lifter = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || gate.lift())
    };
    lifter.join().unwrap();

    assert_eq!(
        gate.wait_after_for(observed, Duration::from_secs(10)),
        Release::AlreadyReleased
    );
    assert_eq!(
        gate.wait_after_for(gate.generation(), Duration::from_millis(20)),
        Release::TimedOut
    );
}
