//! Black-box exercises against a real temporary disk image, covering the
//! filesystem's end-to-end laws and a handful of literal boundary scenarios.

use simplefs::error::Error;
use simplefs::SimpleFs;

fn disk_path(dir: &tempfile::TempDir) -> String {
    dir.path().join("SFS_DISK").to_str().unwrap().to_owned()
}

#[test]
fn round_trip_any_buffer_up_to_the_addressing_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();

    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let fd = fs.fopen("roundtrip").unwrap();
    assert_eq!(fs.fwrite(fd, &payload).unwrap(), payload.len());
    fs.fseek(fd, 0).unwrap();
    let mut back = vec![0u8; payload.len()];
    assert_eq!(fs.fread(fd, &mut back).unwrap(), payload.len());
    assert_eq!(back, payload);
}

#[test]
fn persists_across_a_fresh_false_remount() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    {
        let mut fs = SimpleFs::mksfs(true, &path).unwrap();
        let fd = fs.fopen("note").unwrap();
        fs.fwrite(fd, b"remember me").unwrap();
        fs.fclose(fd).unwrap();
    }
    let mut fs = SimpleFs::mksfs(false, &path).unwrap();
    let fd = fs.fopen("note").unwrap();
    let mut buf = [0u8; 11];
    assert_eq!(fs.fread(fd, &mut buf).unwrap(), 11);
    assert_eq!(&buf, b"remember me");
}

#[test]
fn open_is_idempotent_without_an_intervening_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let a = fs.fopen("x").unwrap();
    let b = fs.fopen("x").unwrap();
    assert_eq!(a, b);
}

#[test]
fn removing_a_file_releases_exactly_the_blocks_it_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();

    let before = fs.allocator_free_blocks();
    let fd = fs.fopen("spender").unwrap();
    // past the direct-pointer limit, so an indirect block is also charged.
    fs.fwrite(fd, &vec![9u8; 12 * 1024 + 1]).unwrap();
    fs.fclose(fd).unwrap();
    let used = before - fs.allocator_free_blocks();

    fs.remove("spender").unwrap();
    assert_eq!(fs.allocator_free_blocks(), before);
    assert_eq!(used, 14);
}

#[test]
fn repeated_writes_without_seeking_concatenate() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("log").unwrap();
    fs.fwrite(fd, b"one-").unwrap();
    fs.fwrite(fd, b"two-").unwrap();
    fs.fwrite(fd, b"three").unwrap();
    fs.fseek(fd, 0).unwrap();
    let mut buf = [0u8; 13];
    fs.fread(fd, &mut buf).unwrap();
    assert_eq!(&buf, b"one-two-three");
}

#[test]
fn boundary_fresh_mount_write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("a").unwrap();
    fs.fwrite(fd, b"hi").unwrap();
    fs.fseek(fd, 0).unwrap();
    let mut buf = [0u8; 2];
    fs.fread(fd, &mut buf).unwrap();
    assert_eq!(&buf, b"hi");
    assert_eq!(fs.getfilesize("a").unwrap(), 2);
}

#[test]
fn boundary_exactly_twelve_blocks_uses_only_direct_pointers() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("big").unwrap();
    let before = fs.allocator_free_blocks();
    fs.fwrite(fd, &vec![b'a'; 12 * 1024]).unwrap();
    assert_eq!(fs.getfilesize("big").unwrap(), 12 * 1024);
    // twelve data blocks only, no indirect block.
    assert_eq!(before - fs.allocator_free_blocks(), 12);
}

#[test]
fn boundary_one_byte_past_twelve_blocks_allocates_the_indirect_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("big").unwrap();
    let before = fs.allocator_free_blocks();
    let payload = vec![b'a'; 12 * 1024 + 1];
    fs.fwrite(fd, &payload).unwrap();
    assert_eq!(before - fs.allocator_free_blocks(), 14);
    fs.fseek(fd, 0).unwrap();
    let mut back = vec![0u8; payload.len()];
    fs.fread(fd, &mut back).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn boundary_disk_exhaustion_then_recovery_via_remove() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();

    // A single file is capped well below the disk's total data blocks (269
    // blocks: 268 data plus the indirect block), so draining the disk means
    // spreading across many files, each maxed out, then topping off with
    // one-block files until nothing is left.
    let max_payload = vec![1u8; 268 * 1024];
    let mut i = 0;
    while fs.allocator_free_blocks() >= 269 {
        let name = format!("hog{i}");
        let fd = fs.fopen(&name).unwrap();
        fs.fwrite(fd, &max_payload).unwrap();
        fs.fclose(fd).unwrap();
        i += 1;
    }
    while fs.allocator_free_blocks() > 0 {
        let name = format!("crumb{i}");
        let fd = fs.fopen(&name).unwrap();
        fs.fwrite(fd, &vec![1u8; 1024]).unwrap();
        fs.fclose(fd).unwrap();
        i += 1;
    }
    assert_eq!(fs.allocator_free_blocks(), 0);

    let fd = fs.fopen("overflow").unwrap();
    assert!(matches!(fs.fwrite(fd, b"x"), Err(Error::OutOfSpace)));

    fs.remove("hog0").unwrap();
    assert!(fs.fwrite(fd, b"x").is_ok());
}

#[test]
fn boundary_remove_then_reopen_yields_a_fresh_zero_length_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("a").unwrap();
    fs.fwrite(fd, b"old content").unwrap();
    fs.fclose(fd).unwrap();

    fs.remove("a").unwrap();
    let fd = fs.fopen("a").unwrap();
    assert_eq!(fs.getfilesize("a").unwrap(), 0);
    let mut buf = [0u8; 1];
    assert_eq!(fs.fread(fd, &mut buf).unwrap(), 0);
}

#[test]
fn boundary_seek_to_size_reads_nothing_seek_past_size_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = disk_path(&dir);
    let mut fs = SimpleFs::mksfs(true, &path).unwrap();
    let fd = fs.fopen("a").unwrap();
    fs.fwrite(fd, b"abcde").unwrap();
    fs.fseek(fd, 5).unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(fs.fread(fd, &mut buf).unwrap(), 0);
    assert!(matches!(fs.fseek(fd, 6), Err(Error::InvalidPosition)));
}
