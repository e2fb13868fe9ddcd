use super::{
    FILE_FLAG_READ_ONLY, ImageError, MAGIC, NO_PARENT, NodeId, PackedImage, PackedNode,
    PackedRoot, TAG_DIR, TAG_FILE, VERSION, is_valid_name, normalize_guest_path,
};
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use std::collections::HashSet;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

const HEADER_LEN: usize = 8;
const CHECKSUM_LEN: usize = 8;
/// Smallest encoding of a root entry and of a node; used to reject counts
/// that cannot fit in the remaining input before allocating for them.
const MIN_ROOT_LEN: usize = 4 + 4;
const MIN_NODE_LEN: usize = 1 + 4 + 4 + 4;

type Result<T> = std::result::Result<T, ImageError>;

struct Reader {
    data: Bytes,
    pos: usize,
}

impl Reader {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<Bytes> {
        if self.remaining() < len {
            return Err(ImageError::corrupt(self.pos, format!("truncated {what}")));
        }
        let bytes = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.take(2, what)?))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.take(4, what)?))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.take(8, what)?))
    }

    fn count(&mut self, min_len: usize, what: &str) -> Result<usize> {
        let offset = self.pos;
        let count = self.u32(what)? as usize;
        if count.saturating_mul(min_len) > self.remaining() {
            return Err(ImageError::corrupt(offset, format!("{what} exceeds the image")));
        }
        Ok(count)
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.u32(what)? as usize;
        let offset = self.pos;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ImageError::corrupt(offset, format!("{what} is not valid UTF-8")))
    }
}

impl PackedImage {
    /// Decodes and validates an image.
    ///
    /// File contents are slices of `data`, so decoding does not copy them.
    pub fn decode(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(ImageError::corrupt(0, "image is too short"));
        }
        if &data[..4] != MAGIC {
            return Err(ImageError::corrupt(0, "bad magic"));
        }
        let version = LittleEndian::read_u16(&data[4..6]);
        if version != VERSION {
            return Err(ImageError::corrupt(4, format!("unsupported version {version}")));
        }
        if LittleEndian::read_u16(&data[6..8]) != 0 {
            return Err(ImageError::corrupt(6, "reserved header field is set"));
        }
        let body_len = data.len() - CHECKSUM_LEN;
        let expected = LittleEndian::read_u64(&data[body_len..]);
        if xxh64(&data[..body_len], 0) != expected {
            return Err(ImageError::corrupt(body_len, "checksum mismatch"));
        }

        let mut reader = Reader {
            data: data.slice(..body_len),
            pos: HEADER_LEN,
        };

        let root_count = reader.count(MIN_ROOT_LEN, "root table")?;
        let mut roots = Vec::with_capacity(root_count);
        let mut root_offsets = Vec::with_capacity(root_count);
        for _ in 0..root_count {
            root_offsets.push(reader.pos);
            let guest_path = reader.string("root path")?;
            let node = NodeId::from_index(reader.u32("root node")?);
            roots.push(PackedRoot { guest_path, node });
        }

        let node_count = reader.count(MIN_NODE_LEN, "node table")?;
        let mut nodes = Vec::with_capacity(node_count);
        let mut node_offsets = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            node_offsets.push(reader.pos);
            nodes.push(read_node(&mut reader)?);
        }

        if reader.remaining() != 0 {
            return Err(ImageError::corrupt(reader.pos, "trailing bytes"));
        }

        let image = PackedImage::from_parts(roots, nodes);
        validate(&image, &root_offsets, &node_offsets)?;
        debug!(
            roots = image.roots().len(),
            nodes = image.len(),
            "decoded packed image"
        );
        Ok(image)
    }
}

fn read_node(reader: &mut Reader) -> Result<PackedNode> {
    let offset = reader.pos;
    let tag = reader.u8("node tag")?;
    let parent = reader.u32("node parent")?;
    let name = reader.string("node name")?;
    let parent = (parent != NO_PARENT).then(|| NodeId::from_index(parent));
    match tag {
        TAG_FILE => {
            let flags = reader.u8("file flags")?;
            let len = reader.u64("file length")?;
            let len = usize::try_from(len)
                .map_err(|_| ImageError::corrupt(reader.pos, "file length overflows"))?;
            let content = reader.take(len, "file content")?;
            let parent =
                parent.ok_or_else(|| ImageError::corrupt(offset, "file without a parent"))?;
            Ok(PackedNode::File {
                name,
                parent,
                content,
                read_only: flags & FILE_FLAG_READ_ONLY != 0,
            })
        }
        TAG_DIR => {
            let child_count = reader.count(4, "child list")?;
            let mut children = Vec::with_capacity(child_count);
            for _ in 0..child_count {
                children.push(NodeId::from_index(reader.u32("child id")?));
            }
            Ok(PackedNode::Directory {
                name,
                parent,
                children,
            })
        }
        other => Err(ImageError::corrupt(offset, format!("unknown node tag {other}"))),
    }
}

/// Checks the structural invariants: every node is reachable from exactly
/// one root through exactly one parent, names are valid and unique per
/// directory, and roots are distinct absolute paths naming directories.
fn validate(image: &PackedImage, root_offsets: &[usize], node_offsets: &[usize]) -> Result<()> {
    let node_count = image.len();
    let mut root_paths = HashSet::new();
    let mut seen = vec![false; node_count as usize];
    let mut stack = Vec::new();

    for (root, &offset) in image.roots().iter().zip(root_offsets) {
        match normalize_guest_path(&root.guest_path) {
            Ok(normalized) if normalized == root.guest_path => {}
            _ => return Err(ImageError::corrupt(offset, "root path is not normalized")),
        }
        if !root_paths.insert(root.guest_path.as_str()) {
            return Err(ImageError::corrupt(offset, "duplicate root path"));
        }
        match image.node(root.node) {
            Some(PackedNode::Directory {
                parent: None, name, ..
            }) if name.is_empty() => {}
            Some(_) => {
                return Err(ImageError::corrupt(offset, "root is not a top-level directory"));
            }
            None => return Err(ImageError::corrupt(offset, "dangling root node")),
        }
        stack.push(root.node);
    }

    while let Some(id) = stack.pop() {
        let offset = node_offsets[id.index() as usize];
        if std::mem::replace(&mut seen[id.index() as usize], true) {
            return Err(ImageError::corrupt(offset, "node is reachable twice"));
        }
        let Some(PackedNode::Directory { children, .. }) = image.node(id) else {
            continue;
        };
        let mut names = HashSet::with_capacity(children.len());
        for &child in children {
            let Some(child_node) = image.node(child) else {
                return Err(ImageError::corrupt(offset, "dangling child id"));
            };
            if child_node.parent() != Some(id) {
                return Err(ImageError::corrupt(offset, "child does not point back to its parent"));
            }
            if !is_valid_name(child_node.name()) {
                return Err(ImageError::corrupt(
                    node_offsets[child.index() as usize],
                    "invalid entry name",
                ));
            }
            if !names.insert(child_node.name()) {
                return Err(ImageError::corrupt(offset, "duplicate entry name"));
            }
            stack.push(child);
        }
    }

    if let Some(index) = seen.iter().position(|seen| !seen) {
        return Err(ImageError::corrupt(node_offsets[index], "unreachable node"));
    }
    Ok(())
}
