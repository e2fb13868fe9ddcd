use super::{
    FILE_FLAG_READ_ONLY, MAGIC, NO_PARENT, PackedImage, PackedNode, TAG_DIR, TAG_FILE, VERSION,
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};
use xxhash_rust::xxh64::Xxh64;

/// Hashes everything written through it, for the checksum trailer.
struct HashingWriter<W> {
    inner: W,
    hasher: Xxh64,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_str<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    out.write_u32::<LittleEndian>(value.len() as u32)?;
    out.write_all(value.as_bytes())
}

impl PackedImage {
    /// Serializes the image. Encoding is deterministic: decoding the output
    /// and encoding again yields the same bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a Vec never fails
        let _ = self.write_to(&mut out);
        out
    }

    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut out = HashingWriter {
            inner: writer,
            hasher: Xxh64::new(0),
        };
        out.write_all(MAGIC)?;
        out.write_u16::<LittleEndian>(VERSION)?;
        out.write_u16::<LittleEndian>(0)?;

        out.write_u32::<LittleEndian>(self.roots().len() as u32)?;
        for root in self.roots() {
            write_str(&mut out, &root.guest_path)?;
            out.write_u32::<LittleEndian>(root.node.index())?;
        }

        out.write_u32::<LittleEndian>(self.len())?;
        for node in &self.nodes {
            match node {
                PackedNode::File {
                    name,
                    parent,
                    content,
                    read_only,
                } => {
                    out.write_u8(TAG_FILE)?;
                    out.write_u32::<LittleEndian>(parent.index())?;
                    write_str(&mut out, name)?;
                    out.write_u8(if *read_only { FILE_FLAG_READ_ONLY } else { 0 })?;
                    out.write_u64::<LittleEndian>(content.len() as u64)?;
                    out.write_all(content)?;
                }
                PackedNode::Directory {
                    name,
                    parent,
                    children,
                } => {
                    out.write_u8(TAG_DIR)?;
                    out.write_u32::<LittleEndian>(parent.map(|p| p.index()).unwrap_or(NO_PARENT))?;
                    write_str(&mut out, name)?;
                    out.write_u32::<LittleEndian>(children.len() as u32)?;
                    for child in children {
                        out.write_u32::<LittleEndian>(child.index())?;
                    }
                }
            }
        }

        let checksum = out.hasher.digest();
        out.inner.write_u64::<LittleEndian>(checksum)?;
        out.inner.flush()
    }
}
