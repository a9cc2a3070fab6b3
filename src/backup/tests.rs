#[cfg(test)]
mod tests {
    use crate::backup::create::{create_backup, create_backup_at, BackupOptions, CancelToken};
    use crate::backup::data::BackupKind;
    use crate::backup::listing::list_backups;
    use crate::error::BackupError;
    use crate::export_root::ExportRoot;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    /// Export root `<tmp>/exports/JKSV` plus a save folder `<tmp>/saves/<title id>`.
    struct Fixture {
        _dir: TempDir,
        root: ExportRoot,
        save_dir: PathBuf,
        game_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let root_path = dir.path().join("exports").join("JKSV");
        fs::create_dir_all(&root_path).unwrap();
        let save_dir = dir.path().join("saves").join("0100ABCD00010000");
        fs::create_dir_all(&save_dir).unwrap();

        Fixture {
            root: ExportRoot::new(&root_path).unwrap(),
            game_dir: root_path.join("My Game [0100ABCD00010000]"),
            save_dir,
            _dir: dir,
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Tests the full scenario: the game folder is created and the save copied byte for byte.
    #[test]
    fn test_backup_flow() {
        let fx = fixture();
        fs::write(fx.save_dir.join("save0.bin"), [0x01u8, 0x02, 0x03]).unwrap();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();

        let backup = create_backup_at(
            &fx.root,
            &fx.save_dir,
            &fx.game_dir,
            "Player1",
            timestamp,
            &BackupOptions::default(),
        )
        .unwrap();

        assert_eq!(backup, fx.game_dir.join("Player1 - 2024.01.15 @ 10.30.00"));
        assert_eq!(file_names(&backup), vec!["save0.bin"]);
        assert_eq!(fs::read(backup.join("save0.bin")).unwrap(), vec![0x01, 0x02, 0x03]);

        // The new backup is found by title id and listed back with its metadata.
        let found = fx.root.find_export_path("0100ABCD00010000").unwrap();
        assert_eq!(found.as_deref(), Some(fx.game_dir.as_path()));

        let backups = list_backups(&fx.game_dir).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].path, backup);
        assert_eq!(backups[0].username, "Player1");
        assert_eq!(backups[0].timestamp, timestamp);
        assert_eq!(backups[0].kind, BackupKind::Directory);
    }

    /// Tests that every file is copied with identical content and nothing else is added.
    #[test]
    fn test_backup_copies_all_files() {
        let fx = fixture();
        fs::write(fx.save_dir.join("a.dat"), "alpha").unwrap();
        fs::write(fx.save_dir.join("b.dat"), "bravo").unwrap();

        let backup = create_backup(&fx.root, &fx.save_dir, &fx.game_dir, "Player1").unwrap();

        assert_eq!(file_names(&backup), vec!["a.dat", "b.dat"]);
        assert_eq!(fs::read_to_string(backup.join("a.dat")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(backup.join("b.dat")).unwrap(), "bravo");
    }

    /// Tests that nested save files are flattened into the backup folder.
    #[test]
    fn test_backup_flattens_nested_files() {
        let fx = fixture();
        fs::create_dir_all(fx.save_dir.join("slot1").join("meta")).unwrap();
        fs::write(fx.save_dir.join("main.sav"), "main").unwrap();
        fs::write(fx.save_dir.join("slot1").join("slot.sav"), "slot").unwrap();
        fs::write(fx.save_dir.join("slot1").join("meta").join("info.json"), "{}").unwrap();

        let options = BackupOptions {
            workers: 2,
            ..BackupOptions::default()
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let backup = create_backup_at(
            &fx.root,
            &fx.save_dir,
            &fx.game_dir,
            "Player1",
            timestamp,
            &options,
        )
        .unwrap();

        assert_eq!(file_names(&backup), vec!["info.json", "main.sav", "slot.sav"]);
        assert_eq!(fs::read_to_string(backup.join("slot.sav")).unwrap(), "slot");
    }

    /// Tests that symlinked save files are copied by content.
    #[cfg(unix)]
    #[test]
    fn test_backup_copies_symlinked_files() {
        use std::os::unix::fs::symlink;

        let fx = fixture();
        let outside = fx.save_dir.parent().unwrap().join("real.bin");
        fs::write(&outside, [0x0Au8, 0x0B, 0x0C]).unwrap();
        fs::write(fx.save_dir.join("a.dat"), "alpha").unwrap();
        symlink(&outside, fx.save_dir.join("linked.bin")).unwrap();
        // Dangling links are skipped, not fatal.
        symlink(fx.save_dir.join("gone"), fx.save_dir.join("dangling.bin")).unwrap();

        let backup = create_backup(&fx.root, &fx.save_dir, &fx.game_dir, "Player1").unwrap();

        assert_eq!(file_names(&backup), vec!["a.dat", "linked.bin"]);
        let copied = backup.join("linked.bin");
        assert!(!fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(copied).unwrap(), vec![0x0A, 0x0B, 0x0C]);
    }

    /// Tests that copied save files keep the source permissions.
    #[cfg(unix)]
    #[test]
    fn test_backup_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        let source = fx.save_dir.join("save0.bin");
        fs::write(&source, "data").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o640)).unwrap();

        let backup = create_backup(&fx.root, &fx.save_dir, &fx.game_dir, "Player1").unwrap();

        let mode = fs::metadata(backup.join("save0.bin")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    /// Tests that two save files with the same name make the flat copy fail instead of overwriting.
    #[test]
    fn test_backup_name_collision_fails() {
        let fx = fixture();
        fs::create_dir_all(fx.save_dir.join("a")).unwrap();
        fs::create_dir_all(fx.save_dir.join("b")).unwrap();
        fs::write(fx.save_dir.join("a").join("data.sav"), "one").unwrap();
        fs::write(fx.save_dir.join("b").join("data.sav"), "two").unwrap();

        let options = BackupOptions {
            workers: 1,
            ..BackupOptions::default()
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = create_backup_at(
            &fx.root,
            &fx.save_dir,
            &fx.game_dir,
            "Player1",
            timestamp,
            &options,
        );
        assert!(matches!(result, Err(BackupError::AlreadyExists { .. })));

        // Without cleanup the partially filled backup stays on disk.
        let partial = fx.game_dir.join("Player1 - 2024.01.15 @ 10.30.00");
        assert!(partial.is_dir());
        assert_eq!(file_names(&partial), vec!["data.sav"]);
        assert_eq!(fs::read_to_string(partial.join("data.sav")).unwrap(), "one");
    }

    /// Tests that the partial backup folder is removed when cleanup is enabled.
    #[test]
    fn test_backup_cleanup_on_failure() {
        let fx = fixture();
        fs::create_dir_all(fx.save_dir.join("a")).unwrap();
        fs::create_dir_all(fx.save_dir.join("b")).unwrap();
        fs::write(fx.save_dir.join("a").join("data.sav"), "one").unwrap();
        fs::write(fx.save_dir.join("b").join("data.sav"), "two").unwrap();

        let options = BackupOptions {
            cleanup_on_failure: true,
            ..BackupOptions::default()
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = create_backup_at(
            &fx.root,
            &fx.save_dir,
            &fx.game_dir,
            "Player1",
            timestamp,
            &options,
        );

        assert!(result.is_err());
        assert!(!fx.game_dir.join("Player1 - 2024.01.15 @ 10.30.00").exists());
        // The game folder itself was created before copying and stays.
        assert!(fx.game_dir.is_dir());
    }

    /// Tests that a cancelled run copies nothing and reports cancellation.
    #[test]
    fn test_backup_cancelled() {
        let fx = fixture();
        fs::write(fx.save_dir.join("save0.bin"), "data").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let options = BackupOptions {
            cancel: Some(cancel),
            ..BackupOptions::default()
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = create_backup_at(
            &fx.root,
            &fx.save_dir,
            &fx.game_dir,
            "Player1",
            timestamp,
            &options,
        );

        assert!(matches!(result, Err(BackupError::Cancelled { .. })));
        let partial = fx.game_dir.join("Player1 - 2024.01.15 @ 10.30.00");
        assert!(file_names(&partial).is_empty());
    }

    /// Tests that a backup root outside the export root is refused without creating anything.
    #[test]
    fn test_backup_out_of_scope() {
        let fx = fixture();
        fs::write(fx.save_dir.join("save0.bin"), "data").unwrap();
        let outside = fx.save_dir.parent().unwrap().join("elsewhere");

        let result = create_backup(&fx.root, &fx.save_dir, &outside, "Player1");
        assert!(matches!(result, Err(BackupError::OutOfScope { .. })));
        assert!(!outside.exists());

        let escaping = fx.root.root_path().join("..").join("escape");
        let result = create_backup(&fx.root, &fx.save_dir, &escaping, "Player1");
        assert!(matches!(result, Err(BackupError::OutOfScope { .. })));
        assert!(!fx.root.root_path().parent().unwrap().join("escape").exists());
    }

    /// Tests that a second backup in the same second collides.
    #[test]
    fn test_backup_same_timestamp_collides() {
        let fx = fixture();
        fs::write(fx.save_dir.join("save0.bin"), "data").unwrap();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let options = BackupOptions::default();

        create_backup_at(&fx.root, &fx.save_dir, &fx.game_dir, "Player1", timestamp, &options)
            .unwrap();
        let result =
            create_backup_at(&fx.root, &fx.save_dir, &fx.game_dir, "Player1", timestamp, &options);
        assert!(matches!(result, Err(BackupError::AlreadyExists { .. })));
    }

    /// Tests argument validation for backup creation.
    #[test]
    fn test_backup_invalid_arguments() {
        let fx = fixture();

        assert!(matches!(
            create_backup(&fx.root, Path::new(""), &fx.game_dir, "Player1"),
            Err(BackupError::InvalidArgument { name: "save_game_dir" })
        ));
        assert!(matches!(
            create_backup(&fx.root, &fx.save_dir, Path::new(" "), "Player1"),
            Err(BackupError::InvalidArgument { name: "backup_root_dir" })
        ));
        assert!(matches!(
            create_backup(&fx.root, &fx.save_dir, &fx.game_dir, "  "),
            Err(BackupError::InvalidArgument { name: "username" })
        ));

        let missing = fx.save_dir.join("missing");
        assert!(matches!(
            create_backup(&fx.root, &missing, &fx.game_dir, "Player1"),
            Err(BackupError::NotFound { .. })
        ));
        assert!(!fx.game_dir.exists());
    }

    /// Tests that an empty save folder still produces an empty backup folder.
    #[test]
    fn test_backup_empty_save_dir() {
        let fx = fixture();
        let backup = create_backup(&fx.root, &fx.save_dir, &fx.game_dir, "Player1").unwrap();
        assert!(backup.is_dir());
        assert!(file_names(&backup).is_empty());
    }

    /// Tests that backups made with a single worker and with many workers match.
    #[test]
    fn test_backup_worker_counts() {
        let fx = fixture();
        for i in 0..20 {
            fs::write(fx.save_dir.join(format!("file{:02}.dat", i)), format!("data {}", i)).unwrap();
        }

        for (second, workers) in [(0, 0), (1, 1), (2, 64)] {
            let options = BackupOptions {
                workers,
                ..BackupOptions::default()
            };
            let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, second).unwrap();
            let backup = create_backup_at(
                &fx.root,
                &fx.save_dir,
                &fx.game_dir,
                "Player1",
                timestamp,
                &options,
            )
            .unwrap();

            assert_eq!(file_names(&backup).len(), 20);
            assert_eq!(fs::read_to_string(backup.join("file07.dat")).unwrap(), "data 7");
        }

        assert_eq!(list_backups(&fx.game_dir).unwrap().len(), 3);
    }
}
