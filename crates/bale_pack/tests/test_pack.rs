use assert2::{assert, let_assert};
use bale_pack::pack_io::reading::ReadError;
use bale_pack::{
    gather_resources, pack_resources, GroupingStrategy, PackConfig, PackIndex, PackReader,
    Resource, ResourceGroup, ResourceType, RetentionKind,
};
use common::{config, contents, id, pack, random_groups, RETENTION_KINDS};
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use tracing_test::traced_test;

mod common;

/// Within every shard, entries sorted by offset start at 0 and leave no gaps.
fn assert_contiguous(index: &PackIndex) {
    for shard in 0..index.shard_count() {
        let mut expected = 0;
        for (_, entry) in index.shard_entries(shard as u8) {
            assert!(entry.offset == expected);
            expected += u64::from(entry.length);
        }
    }
}

#[test]
#[traced_test]
fn round_trip() -> Result<(), Box<dyn Error>> {
    let groups = random_groups(7, 40, 300);
    let expected = contents(&groups);

    for retention in RETENTION_KINDS {
        let dir = tempfile::tempdir()?;
        let config = config(1000, retention);
        let index = pack(dir.path(), &groups, &config)?;
        assert!(index.shard_count() > 1);

        let reader = PackReader::open_with_config(dir.path(), &config)?;
        assert!(reader.index() == &index);

        for (id, bytes) in &expected {
            let stream = reader.load_resource(id, ResourceType::Raw)?;
            assert!(stream.len() == bytes.len() as u64);
            assert!(&stream.read_to_vec()? == bytes, "{id} with {retention:?}");
        }

        reader.verify()?;
    }

    Ok(())
}

#[test]
fn shards_respect_the_soft_cap() -> Result<(), Box<dyn Error>> {
    let cap = 1000;
    let mut groups = random_groups(11, 60, 200);
    // one group larger than the cap on its own
    groups.insert(
        20,
        ResourceGroup::single(Resource::from_bytes(
            id("test:big/one"),
            ResourceType::Raw,
            vec![1u8; 2500],
        )),
    );

    let dir = tempfile::tempdir()?;
    let index = pack(dir.path(), &groups, &config(cap, RetentionKind::OpenPerCall))?;

    let sizes = index.shard_sizes();
    let oversized: Vec<_> = sizes.iter().filter(|&&size| size > cap).collect();
    assert!(oversized == [&2500]);

    for (shard, size) in sizes.iter().enumerate() {
        assert!(fs::metadata(dir.path().join(shard.to_string()))?.len() == *size);
    }

    Ok(())
}

#[test]
fn groups_share_a_shard_and_shards_are_contiguous() -> Result<(), Box<dyn Error>> {
    let groups = random_groups(3, 80, 200);
    let dir = tempfile::tempdir()?;
    let index = pack(dir.path(), &groups, &config(700, RetentionKind::SingleMapped))?;

    for group in &groups {
        let shards: Vec<_> = group
            .resources()
            .map(|resource| index.get(resource.id()).unwrap().shard)
            .collect();
        assert!(shards.iter().all(|&shard| shard == shards[0]));
    }

    assert_contiguous(&index);
    assert_contiguous(PackReader::open(dir.path())?.index());

    Ok(())
}

#[test]
fn packing_is_deterministic() -> Result<(), Box<dyn Error>> {
    let first_dir = tempfile::tempdir()?;
    let second_dir = tempfile::tempdir()?;
    let config = config(500, RetentionKind::OpenPerCall);

    let first = pack(first_dir.path(), &random_groups(5, 30, 150), &config)?;
    let second = pack(second_dir.path(), &random_groups(5, 30, 150), &config)?;

    assert!(first == second);
    assert!(
        fs::read(first_dir.path().join("index"))? == fs::read(second_dir.path().join("index"))?
    );
    for shard in 0..first.shard_count() {
        let name = shard.to_string();
        assert!(fs::read(first_dir.path().join(&name))? == fs::read(second_dir.path().join(&name))?);
    }

    Ok(())
}

#[test]
fn scaled_down_cap_scenario() -> Result<(), Box<dyn Error>> {
    let groups: Vec<_> = ["test:s/1", "test:s/2", "test:s/3"]
        .into_iter()
        .map(|name| {
            ResourceGroup::single(Resource::from_bytes(id(name), ResourceType::Raw, vec![0u8; 400]))
        })
        .collect();

    let dir = tempfile::tempdir()?;
    let index = pack(dir.path(), &groups, &config(1024, RetentionKind::SingleMapped))?;

    assert!(index.shard_count() == 2);
    assert!(index.get(&id("test:s/1")).unwrap().shard == 0);
    assert!(index.get(&id("test:s/2")).unwrap().shard == 0);
    assert!(index.get(&id("test:s/3")).unwrap().shard == 1);

    Ok(())
}

#[test]
fn group_members_are_laid_out_in_order() -> Result<(), Box<dyn Error>> {
    let mut builder = ResourceGroup::builder();
    builder
        .add_resource(Resource::from_bytes(id("test:g/a"), ResourceType::Raw, vec![b'a'; 10]))?
        .add_resource(Resource::from_bytes(id("test:g/b"), ResourceType::Raw, vec![b'b'; 20]))?;

    let dir = tempfile::tempdir()?;
    let index = pack(dir.path(), &[builder.build()], &PackConfig::default())?;

    let a = index.get(&id("test:g/a")).unwrap();
    let b = index.get(&id("test:g/b")).unwrap();
    assert!((a.shard, a.offset, a.length) == (0, 0, 10));
    assert!((b.shard, b.offset, b.length) == (0, 10, 20));

    let shard = fs::read(dir.path().join("0"))?;
    assert!(shard[..10] == [b'a'; 10]);
    assert!(shard[10..] == [b'b'; 20]);

    Ok(())
}

#[test]
fn empty_pack() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let index = pack(dir.path(), &[], &PackConfig::default())?;

    assert!(index.shard_count() == 0);
    assert!(!dir.path().join("0").exists());

    let reader = PackReader::open(dir.path())?;
    assert!(reader.index().is_empty());
    let_assert!(
        Err(ReadError::UnknownResource { .. }) =
            reader.load_resource(&id("test:any/thing"), ResourceType::Raw)
    );

    Ok(())
}

#[test]
fn unknown_ids_and_wrong_types_fail() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let group = ResourceGroup::single(Resource::from_bytes(
        id("test:fonts/mono.ttf"),
        ResourceType::Font,
        b"font".to_vec(),
    ));
    pack(dir.path(), &[group], &PackConfig::default())?;

    let reader = PackReader::open(dir.path())?;
    let_assert!(
        Err(ReadError::UnknownResource { id }) =
            reader.load_resource(&common::id("test:fonts/missing-id"), ResourceType::Font)
    );
    assert!(id.as_str() == "test:fonts/missing-id");

    let_assert!(
        Err(ReadError::TypeMismatch {
            expected: ResourceType::Image,
            actual: ResourceType::Font,
            ..
        }) = reader.load_resource(&common::id("test:fonts/mono.ttf"), ResourceType::Image)
    );

    assert!(reader.resource_type(&common::id("test:fonts/mono.ttf")) == Some(ResourceType::Font));
    assert!(
        reader
            .load_resource(&common::id("test:fonts/mono.ttf"), ResourceType::Font)?
            .read_to_utf8()?
            == "font"
    );

    Ok(())
}

#[test]
fn deleted_shard_fails_at_load() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let groups = random_groups(1, 30, 200);
    let index = pack(dir.path(), &groups, &config(500, RetentionKind::SingleMapped))?;
    assert!(index.shard_count() > 2);

    fs::remove_file(dir.path().join("1"))?;

    let_assert!(Err(ReadError::MissingShard { shard: 1, .. }) = PackReader::open(dir.path()));

    Ok(())
}

#[test]
fn truncated_shard_is_a_short_stream() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut builder = ResourceGroup::builder();
    builder
        .add_resource(Resource::from_bytes(id("test:t/a"), ResourceType::Raw, vec![1u8; 50]))?
        .add_resource(Resource::from_bytes(id("test:t/b"), ResourceType::Raw, vec![2u8; 50]))?;
    pack(dir.path(), &[builder.build()], &PackConfig::default())?;

    let shard = fs::read(dir.path().join("0"))?;
    fs::write(dir.path().join("0"), &shard[..80])?;

    for retention in RETENTION_KINDS {
        let reader = PackReader::open_with_config(dir.path(), &config(1 << 20, retention))?;

        let first = reader.load_resource(&id("test:t/a"), ResourceType::Raw)?;
        assert!(first.read_to_vec()? == [1u8; 50]);

        let stream = reader.load_resource(&id("test:t/b"), ResourceType::Raw)?;
        let_assert!(Err(error) = stream.read_to_vec());
        assert!(error.kind() == std::io::ErrorKind::UnexpectedEof);

        let_assert!(Err(ReadError::IoError { .. }) = reader.verify());
    }

    Ok(())
}

#[test]
fn corrupt_index_fails_at_load() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    pack(dir.path(), &random_groups(2, 5, 50), &PackConfig::default())?;

    let index = fs::read(dir.path().join("index"))?;
    fs::write(dir.path().join("index"), &index[..index.len() - 3])?;
    let_assert!(Err(ReadError::TruncatedIndex { .. }) = PackReader::open(dir.path()));

    let mut extended = index.clone();
    extended.extend_from_slice(b"junk");
    fs::write(dir.path().join("index"), &extended)?;
    let_assert!(Err(ReadError::TrailingIndexBytes { count: 4, .. }) = PackReader::open(dir.path()));

    Ok(())
}

#[test]
fn streams_seek_within_the_resource() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let groups = vec![
        ResourceGroup::single(Resource::from_bytes(
            id("test:x/pad"),
            ResourceType::Raw,
            vec![0u8; 33],
        )),
        ResourceGroup::single(Resource::from_bytes(
            id("test:x/text"),
            ResourceType::Lang,
            b"hello=world".to_vec(),
        )),
    ];
    pack(dir.path(), &groups, &PackConfig::default())?;

    for retention in RETENTION_KINDS {
        let reader = PackReader::open_with_config(dir.path(), &config(1 << 20, retention))?;
        let mut stream = reader.load_resource(&id("test:x/text"), ResourceType::Lang)?;

        stream.seek(SeekFrom::Start(6))?;
        let mut rest = String::new();
        stream.read_to_string(&mut rest)?;
        assert!(rest == "world");

        stream.seek(SeekFrom::End(-5))?;
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf)?;
        assert!(&buf == b"wor");
    }

    Ok(())
}

#[test]
#[traced_test]
fn gather_then_pack_resources() -> Result<(), Box<dyn Error>> {
    let resources_dir = tempfile::tempdir()?;
    let root = resources_dir.path();
    fs::create_dir_all(root.join("lang"))?;
    fs::create_dir_all(root.join("textures/ui"))?;
    fs::write(root.join("lang/en.lang"), "hello=Hello")?;
    fs::write(root.join("lang/de.lang"), "hello=Hallo")?;
    fs::write(root.join("textures/ui/button.png"), [0x89, b'P', b'N', b'G'])?;
    fs::write(root.join("textures/ui/notes.txt"), "scratch")?;
    fs::write(root.join("textures/__ignore__"), "*.txt\n")?;

    let resources = gather_resources(root, "demo")?;
    let expected: HashMap<_, _> = resources
        .iter()
        .map(|resource| (resource.id().clone(), resource.resource_type()))
        .collect();
    assert!(expected.len() == 3);

    let pack_dir = tempfile::tempdir()?;
    let out = pack_dir.path().join("pack");
    let index = pack_resources(resources, GroupingStrategy::Category, &PackConfig::default(), &out)?;
    assert!(index.len() == 3);

    let reader = PackReader::open(&out)?;
    let en = reader.load_resource(&id("demo:lang/en.lang"), ResourceType::Lang)?;
    assert!(en.read_to_utf8()? == "hello=Hello");
    let button = reader.load_resource(&id("demo:textures/ui/button.png"), ResourceType::Image)?;
    assert!(button.read_to_vec()? == [0x89, b'P', b'N', b'G']);

    for (id, resource_type) in expected {
        assert!(reader.resource_type(&id) == Some(resource_type));
    }

    Ok(())
}
