use std::path::PathBuf;

use flatfs::{Config, FileSystem, FsError, Geometry, Slot};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fresh() -> FileSystem {
    init_logger();
    FileSystem::new(Config::default()).unwrap()
}

/// Config whose artifacts live in their own directory under the temp dir.
fn scratch_config(test: &str) -> Config {
    let dir: PathBuf = std::env::temp_dir().join(format!("flatfs_{test}_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    Config {
        disk_path: dir.join("disk.txt"),
        table_path: dir.join("file.txt"),
        ..Config::default()
    }
}

fn bytes(view: Vec<Slot>) -> Vec<u8> {
    view.into_iter().flatten().collect()
}

fn read_all(fs: &mut FileSystem, name: &str) -> Vec<u8> {
    fs.open(name).unwrap();
    let len = fs.length(name).unwrap();
    let data = fs.read(name, 0, len).unwrap();
    fs.close(name).unwrap();
    data
}

#[test]
fn create_then_destroy_restores_bitmap() {
    let mut fs = fresh();
    fs.create("keep").unwrap();
    let before = fs.store().clone();

    fs.create("tmp").unwrap();
    fs.open("tmp").unwrap();
    fs.write("tmp", 0, 42).unwrap();
    fs.close("tmp").unwrap();
    let held = fs.blocks_of("tmp").unwrap().to_vec();
    assert_eq!(held.len(), 5);

    fs.destroy("tmp").unwrap();
    assert_eq!(fs.store(), &before);
    for index in held {
        assert!(!fs.store().is_allocated(index));
    }
}

#[test]
fn write_then_read_returns_source_bytes() {
    let mut fs = fresh();
    fs.create("f").unwrap();
    fs.open("f").unwrap();
    fs.write("f", 17, 33).unwrap();
    fs.close("f").unwrap();

    let expected: Vec<u8> = (18..=50).collect();
    assert_eq!(read_all(&mut fs, "f"), expected);
}

#[test]
fn appends_accumulate() {
    let mut fs = fresh();
    fs.create("f").unwrap();
    fs.open("f").unwrap();
    fs.append("f", 0, 7).unwrap();
    assert_eq!(fs.length("f").unwrap(), 7);
    fs.append("f", 40, 16).unwrap();
    assert_eq!(fs.length("f").unwrap(), 23);
    fs.close("f").unwrap();

    let expected: Vec<u8> = (1..=7).chain(41..=56).collect();
    assert_eq!(read_all(&mut fs, "f"), expected);
    assert_eq!(bytes(fs.view("f").unwrap()), expected);
}

#[test]
fn large_write_allocates_fresh_blocks() {
    let mut fs = fresh();
    fs.create("a").unwrap();
    fs.create("b").unwrap();
    fs.create("c").unwrap();
    // leave a hole at 21 so the chain of "c" is not contiguous
    fs.destroy("b").unwrap();

    let free_before = fs.store().free_count();
    fs.open("c").unwrap();
    fs.write("c", 0, 35).unwrap();
    let blocks = fs.blocks_of("c").unwrap().to_vec();
    assert_eq!(blocks, vec![22, 21, 23, 24]);
    assert_eq!(fs.store().free_count(), free_before - 3);
    assert_eq!(fs.length("c").unwrap(), 35);
}

#[test]
fn reference_scenario() {
    let mut fs = fresh();
    fs.create("A").unwrap();
    assert_eq!(fs.blocks_of("A").unwrap(), &[20]);

    fs.open("A").unwrap();
    fs.write("A", 0, 15).unwrap();
    assert_eq!(fs.blocks_of("A").unwrap(), &[20, 21]);
    assert_eq!(fs.length("A").unwrap(), 15);
    assert!(matches!(fs.seek("A", 20), Err(FsError::InvalidPosition { .. })));

    fs.close("A").unwrap();
    fs.destroy("A").unwrap();
    assert!(!fs.store().is_allocated(20));
    assert!(!fs.store().is_allocated(21));
}

#[test]
fn writer_after_reader_conflicts() {
    let mut fs = fresh();
    fs.create("f").unwrap();
    fs.open("f").unwrap();
    fs.write("f", 0, 5).unwrap();
    fs.close("f").unwrap();

    fs.open("f").unwrap();
    fs.read("f", 0, 2).unwrap();
    assert!(matches!(fs.append("f", 0, 1), Err(FsError::ModeConflict { .. })));
    assert_eq!(fs.length("f").unwrap(), 5);
}

#[test]
fn handles_run_out_and_come_back() {
    let mut fs = fresh();
    let slots = fs.geometry().fd_count;
    for i in 1..slots {
        assert_eq!(fs.create(&format!("f{i}")).unwrap(), i);
    }
    assert!(matches!(fs.create("extra"), Err(FsError::HandlesExhausted)));
    assert!(!fs.directory().contains("extra"));

    fs.destroy("f4").unwrap();
    assert_eq!(fs.create("extra").unwrap(), 4);
}

#[test]
fn disk_full_refuses_without_side_effects() {
    init_logger();
    let mut fs = FileSystem::new(Config {
        geometry: Geometry {
            block_count: 23,
            block_size: 10,
            reserved: 20,
            ..Geometry::default()
        },
        ..Config::default()
    })
    .unwrap();
    fs.create("a").unwrap();
    fs.create("b").unwrap();
    fs.open("a").unwrap();

    // 25 bytes need two more blocks, only one is left
    assert!(matches!(fs.write("a", 0, 25), Err(FsError::OutOfSpace)));
    assert_eq!(fs.blocks_of("a").unwrap(), &[20]);
    assert_eq!(fs.length("a").unwrap(), 0);

    fs.write("a", 0, 19).unwrap();
    assert_eq!(fs.store().free_count(), 0);
    assert!(matches!(fs.create("c"), Err(FsError::OutOfSpace)));

    // the other file still works
    fs.open("b").unwrap();
    fs.write("b", 0, 9).unwrap();
    fs.close("b").unwrap();
    assert_eq!(read_all(&mut fs, "b"), (1..=9).collect::<Vec<u8>>());
}

#[test]
fn invalid_names_are_refused() {
    let mut fs = fresh();
    assert!(matches!(fs.create("has space"), Err(FsError::InvalidName(_))));
    assert!(matches!(fs.create(""), Err(FsError::InvalidName(_))));
    fs.create("ok").unwrap();
    assert!(matches!(fs.create("ok"), Err(FsError::NameExists(_))));
}

#[test]
fn save_then_load_is_identical() {
    init_logger();
    let config = scratch_config("roundtrip");
    let mut fs = FileSystem::new(config.clone()).unwrap();
    fs.create("one").unwrap();
    fs.create("two").unwrap();
    fs.create("three").unwrap();
    fs.destroy("two").unwrap();

    fs.open("one").unwrap();
    fs.write("one", 0, 27).unwrap();
    fs.close("one").unwrap();

    // a zero byte must survive the text format
    fs.memory_mut().set_range(0, &[0, 5, 0]).unwrap();
    fs.open("three").unwrap();
    fs.append("three", 0, 3).unwrap();
    fs.close("three").unwrap();
    fs.save().unwrap();

    let loaded = FileSystem::load(config).unwrap();
    assert_eq!(loaded.store(), fs.store());
    assert_eq!(loaded.directory(), fs.directory());
    assert_eq!(loaded.descriptors(), fs.descriptors());
    assert_eq!(loaded.length("three").unwrap(), 3);
    assert_eq!(bytes(loaded.view("three").unwrap()), vec![0, 5, 0]);
}

#[test]
fn load_without_artifacts_starts_empty() {
    init_logger();
    let config = scratch_config("empty");
    let fs = FileSystem::load(config).unwrap();
    assert!(fs.directory().is_empty());
    assert_eq!(fs.store().free_count(), 1000 - 20);
}

#[test]
fn load_reads_hand_written_artifacts() {
    init_logger();
    let config = Config {
        geometry: Geometry {
            block_count: 24,
            block_size: 4,
            reserved: 20,
            ..Geometry::default()
        },
        ..scratch_config("legacy")
    };
    let mut disk = String::new();
    for i in 0..24 {
        disk.push_str(match i {
            20 => "1\t2\t3\t4\n",
            22 => "5\t6\t0\t0\n",
            _ => "0\t0\t0\t0\n",
        });
    }
    std::fs::write(&config.disk_path, disk).unwrap();
    std::fs::write(&config.table_path, "3 notes 20 22\n").unwrap();

    let mut fs = FileSystem::load(config).unwrap();
    assert_eq!(fs.directory().resolve("notes").unwrap(), 3);
    assert_eq!(fs.length("notes").unwrap(), 6);
    assert!(fs.store().is_allocated(22));
    assert!(!fs.store().is_allocated(21));

    // new blocks fill the hole first
    fs.create("next").unwrap();
    assert_eq!(fs.blocks_of("next").unwrap(), &[21]);
    assert_eq!(read_all(&mut fs, "notes"), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn load_rejects_double_owned_blocks() {
    init_logger();
    let config = Config {
        geometry: Geometry {
            block_count: 22,
            block_size: 2,
            reserved: 20,
            ..Geometry::default()
        },
        ..scratch_config("double")
    };
    std::fs::write(&config.disk_path, "0\t0\n".repeat(22)).unwrap();
    std::fs::write(&config.table_path, "1 a 20\n2 b 20\n").unwrap();
    assert!(matches!(
        FileSystem::load(config),
        Err(FsError::Corrupt { line: 2, .. })
    ));
}

fn small_disk(test: &str, block_count: usize, block_size: usize) -> Config {
    Config {
        geometry: Geometry {
            block_count,
            block_size,
            reserved: 20,
            ..Geometry::default()
        },
        ..scratch_config(test)
    }
}

fn write_disk(config: &Config, blocks: &[(usize, &str)], table: &str) {
    let empty = vec!["0"; config.geometry.block_size].join("\t");
    let mut disk = String::new();
    for i in 0..config.geometry.block_count {
        let line = blocks
            .iter()
            .find(|(index, _)| *index == i)
            .map_or(empty.as_str(), |&(_, line)| line);
        disk.push_str(line);
        disk.push('\n');
    }
    std::fs::write(&config.disk_path, disk).unwrap();
    std::fs::write(&config.table_path, table).unwrap();
}

#[test]
fn load_rejects_empty_slot_inside_a_body_block() {
    init_logger();
    let config = small_disk("body_hole", 24, 4);
    write_disk(&config, &[(20, "1\t0\t3\t4"), (21, "5\t6\t0\t0")], "1 f 20 21\n");
    assert!(matches!(
        FileSystem::load(config),
        Err(FsError::Corrupt { line: 1, .. })
    ));
}

#[test]
fn load_rejects_hole_in_the_last_block() {
    init_logger();
    let config = small_disk("tail_hole", 24, 4);
    write_disk(&config, &[(20, "1\t0\t3\t0")], "\n1 f 20\n");
    // the blank first line still counts
    assert!(matches!(
        FileSystem::load(config),
        Err(FsError::Corrupt { line: 2, .. })
    ));
}

#[test]
fn loaded_chain_views_and_reads_in_order() {
    init_logger();
    let config = small_disk("chain", 24, 4);
    write_disk(
        &config,
        &[(20, "1\t00\t3\t4"), (23, "5\t6\t0\t0")],
        "1 f 20 23\n",
    );
    let mut fs = FileSystem::load(config).unwrap();

    let expected = vec![Some(1), Some(0), Some(3), Some(4), Some(5), Some(6)];
    assert_eq!(fs.view("f").unwrap(), expected);

    fs.open("f").unwrap();
    fs.seek("f", 2).unwrap();
    assert_eq!(fs.read("f", 50, 10).unwrap(), vec![3, 4, 5, 6]);
    fs.close("f").unwrap();

    fs.open("f").unwrap();
    fs.append("f", 0, 3).unwrap();
    fs.close("f").unwrap();
    assert_eq!(bytes(fs.view("f").unwrap()), vec![1, 0, 3, 4, 5, 6, 1, 2, 3]);
}

#[test]
fn close_refuses_to_grow_a_full_tail_on_a_full_disk() {
    init_logger();
    let config = small_disk("full_tail", 21, 2);
    write_disk(&config, &[(20, "7\t8")], "1 f 20\n");
    let mut fs = FileSystem::load(config).unwrap();
    assert_eq!(fs.store().free_count(), 0);

    fs.open("f").unwrap();
    assert!(matches!(fs.close("f"), Err(FsError::OutOfSpace)));
    assert!(fs.is_open("f"));
    assert_eq!(fs.blocks_of("f").unwrap(), &[20]);
    assert_eq!(fs.length("f").unwrap(), 2);
}
