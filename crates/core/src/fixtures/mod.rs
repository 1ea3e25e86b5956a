//! Builders for minimal managed PE images, used by tests.
//!
//! The PE container is written with `object`'s PE writer: DOS stub, PE32 or
//! PE32+ headers and one `.text` section holding a CLI header followed by a
//! metadata root with `#~`, `#Strings`, `#GUID` and `#Blob` streams. The `#~`
//! stream can carry TypeRef, TypeDef, Field, MethodDef, Param, MemberRef and
//! CustomAttribute rows ahead of the assembly tables, sized so that coded and
//! heap indices widen exactly where a compiler would widen them. The images
//! are not loadable by a real runtime.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use object::pe;
use object::write::pe::{NtHeaders, Writer};

use crate::model::AssemblyVersion;

const SECTION_ALIGNMENT: u32 = 0x2000;
const FILE_ALIGNMENT: u32 = 0x200;
const CLI_HEADER_LEN: usize = 72;
const COMIMAGE_FLAGS_ILONLY: u32 = 0x1;

// Table ids used by the builder.
const MODULE: usize = 0x00;
const TYPE_REF: usize = 0x01;
const TYPE_DEF: usize = 0x02;
const FIELD: usize = 0x04;
const METHOD_DEF: usize = 0x06;
const PARAM: usize = 0x08;
const MEMBER_REF: usize = 0x0A;
const CUSTOM_ATTRIBUTE: usize = 0x0C;
const ASSEMBLY: usize = 0x20;
const ASSEMBLY_REF: usize = 0x23;

/// A coded index: the tables it can point at (ones this builder emits) and its tag width.
struct CodedIndex {
    targets: &'static [usize],
    tag_bits: u32,
}

const RESOLUTION_SCOPE: CodedIndex =
    CodedIndex { targets: &[MODULE, ASSEMBLY_REF, TYPE_REF], tag_bits: 2 };
const TYPE_DEF_OR_REF: CodedIndex = CodedIndex { targets: &[TYPE_DEF, TYPE_REF], tag_bits: 2 };
const MEMBER_REF_PARENT: CodedIndex =
    CodedIndex { targets: &[TYPE_DEF, TYPE_REF, METHOD_DEF], tag_bits: 3 };
const HAS_CUSTOM_ATTRIBUTE: CodedIndex = CodedIndex {
    targets: &[
        METHOD_DEF, FIELD, TYPE_REF, TYPE_DEF, PARAM, MEMBER_REF, MODULE, ASSEMBLY, ASSEMBLY_REF,
    ],
    tag_bits: 5,
};
const CUSTOM_ATTRIBUTE_TYPE: CodedIndex =
    CodedIndex { targets: &[METHOD_DEF, MEMBER_REF], tag_bits: 3 };

#[derive(Debug, Clone)]
struct FixtureReference {
    name: String,
    version: AssemblyVersion,
    culture: Option<String>,
    token: Option<Vec<u8>>,
}

/// Builder for a managed module declaring a set of assembly references.
#[derive(Debug, Clone)]
pub struct ManagedModuleBuilder {
    assembly_name: Option<String>,
    references: Vec<FixtureReference>,
    type_refs: u32,
    methods: u32,
    custom_attributes: u32,
    wide_strings: bool,
    wide_blobs: bool,
    wide_guids: bool,
    pe32_plus: bool,
}

impl ManagedModuleBuilder {
    /// Start a module whose own `Assembly` row is named `assembly_name`.
    pub fn new(assembly_name: impl Into<String>) -> Self {
        Self {
            assembly_name: Some(assembly_name.into()),
            references: Vec::new(),
            type_refs: 0,
            methods: 0,
            custom_attributes: 0,
            wide_strings: false,
            wide_blobs: false,
            wide_guids: false,
            pe32_plus: false,
        }
    }

    /// A netmodule-style image with no `Assembly` row.
    pub fn without_assembly_row(mut self) -> Self {
        self.assembly_name = None;
        self
    }

    pub fn reference(mut self, name: impl Into<String>, version: impl Into<AssemblyVersion>) -> Self {
        self.references.push(FixtureReference {
            name: name.into(),
            version: version.into(),
            culture: None,
            token: None,
        });
        self
    }

    pub fn reference_with_token(
        mut self,
        name: impl Into<String>,
        version: impl Into<AssemblyVersion>,
        culture: Option<&str>,
        token: &[u8],
    ) -> Self {
        self.references.push(FixtureReference {
            name: name.into(),
            version: version.into(),
            culture: culture.map(str::to_string),
            token: Some(token.to_vec()),
        });
        self
    }

    /// Emit `count` TypeRef rows ahead of the assembly tables.
    pub fn type_refs(mut self, count: u32) -> Self {
        self.type_refs = count;
        self
    }

    /// Emit a `Program` type owning `count` methods, each with one parameter,
    /// plus one field. Past 2047 methods `HasCustomAttribute` indices widen;
    /// past 65535 the MethodDef and Param list columns do.
    pub fn methods(mut self, count: u32) -> Self {
        self.methods = count;
        self
    }

    /// Emit `count` attribute constructors (MemberRef) and CustomAttribute
    /// rows applied to the assembly, or to the module without an assembly row.
    pub fn custom_attributes(mut self, count: u32) -> Self {
        self.custom_attributes = count;
        self
    }

    /// Use 4-byte `#Strings` indices.
    pub fn wide_string_heap(mut self) -> Self {
        self.wide_strings = true;
        self
    }

    /// Use 4-byte `#Blob` indices.
    pub fn wide_blob_heap(mut self) -> Self {
        self.wide_blobs = true;
        self
    }

    /// Use 4-byte `#GUID` indices.
    pub fn wide_guid_heap(mut self) -> Self {
        self.wide_guids = true;
        self
    }

    /// Write a PE32+ (x64) image instead of PE32.
    pub fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    pub fn build(&self) -> io::Result<Vec<u8>> {
        pe_image(self.pe32_plus, Some(&self.metadata()))
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.build()?)
    }

    fn metadata(&self) -> Vec<u8> {
        let mut strings = StringHeapBuilder::default();
        let mut blobs = BlobHeapBuilder::default();

        let assembly_name = self.assembly_name.as_ref().map(|n| strings.add(n));
        let module_name =
            strings.add(&format!("{}.dll", self.assembly_name.as_deref().unwrap_or("module")));
        let type_names: Vec<u32> =
            (0..self.type_refs).map(|i| strings.add(&format!("Type{i}"))).collect();
        let namespace = strings.add("Fixture");
        let module_type = strings.add("<Module>");
        let program_type = strings.add("Program");
        let field_name = strings.add("value");
        let method_name = strings.add("Run");
        let param_name = strings.add("arg");
        let ctor_name = strings.add(".ctor");
        let refs: Vec<(u32, u32, u32)> = self
            .references
            .iter()
            .map(|r| {
                let name = strings.add(&r.name);
                let culture = r.culture.as_deref().map_or(0, |c| strings.add(c));
                let token = r.token.as_deref().map_or(0, |t| blobs.add(t));
                (name, culture, token)
            })
            .collect();
        // void (int32), static
        let method_sig = blobs.add(&[0x00, 0x01, 0x01, 0x08]);
        // int32 field
        let field_sig = blobs.add(&[0x06, 0x08]);
        // instance void ()
        let ctor_sig = blobs.add(&[0x20, 0x00, 0x01]);
        // prolog only
        let attribute_value = blobs.add(&[0x01, 0x00, 0x00, 0x00]);

        let mut rows = [0u32; 64];
        rows[MODULE] = 1;
        rows[TYPE_REF] = self.type_refs;
        if self.methods > 0 {
            rows[TYPE_DEF] = 2;
            rows[FIELD] = 1;
            rows[METHOD_DEF] = self.methods;
            rows[PARAM] = self.methods;
        }
        rows[MEMBER_REF] = self.custom_attributes;
        rows[CUSTOM_ATTRIBUTE] = self.custom_attributes;
        rows[ASSEMBLY] = u32::from(self.assembly_name.is_some());
        rows[ASSEMBLY_REF] = self.references.len() as u32;

        let strings = strings.finish();
        let blobs = blobs.finish();
        let guids = vec![0x11u8; 16];
        let mut t = TableWriter {
            out: Vec::new(),
            rows,
            wide_strings: self.wide_strings || strings.len() > 0xFFFF,
            wide_blobs: self.wide_blobs || blobs.len() > 0xFFFF,
            wide_guids: self.wide_guids,
        };
        t.header();

        // Module
        t.u16(0);
        t.string(module_name);
        t.guid(1);
        t.guid(0);
        t.guid(0);

        // TypeRef, scoped to AssemblyRef #1 when there is one
        for name in &type_names {
            if self.references.is_empty() {
                t.coded(&RESOLUTION_SCOPE, 0, 1);
            } else {
                t.coded(&RESOLUTION_SCOPE, 2, 1);
            }
            t.string(*name);
            t.string(namespace);
        }

        if self.methods > 0 {
            // <Module>, owning nothing
            t.u32(0);
            t.string(module_type);
            t.string(0);
            t.coded(&TYPE_DEF_OR_REF, 0, 0);
            t.index(FIELD, 1);
            t.index(METHOD_DEF, 1);
            // Program, extending TypeRef #1 when there is one
            t.u32(0x0010_0001);
            t.string(program_type);
            t.string(namespace);
            if self.type_refs > 0 {
                t.coded(&TYPE_DEF_OR_REF, 1, 1);
            } else {
                t.coded(&TYPE_DEF_OR_REF, 0, 0);
            }
            t.index(FIELD, 1);
            t.index(METHOD_DEF, 1);

            t.u16(0x0006);
            t.string(field_name);
            t.blob(field_sig);

            for i in 0..self.methods {
                t.u32(0);
                t.u16(0);
                t.u16(0x0096);
                t.string(method_name);
                t.blob(method_sig);
                t.index(PARAM, i + 1);
            }

            for _ in 0..self.methods {
                t.u16(0);
                t.u16(1);
                t.string(param_name);
            }
        }

        // Attribute constructors hang off Program, TypeRef #1 or the module type.
        let (parent_tag, parent_row) = if self.methods > 0 {
            (0, 2)
        } else if self.type_refs > 0 {
            (1, 1)
        } else {
            (0, 0)
        };
        for _ in 0..self.custom_attributes {
            t.coded(&MEMBER_REF_PARENT, parent_tag, parent_row);
            t.string(ctor_name);
            t.blob(ctor_sig);
        }

        // Sorted by parent: every attribute sits on the same row.
        let (owner_tag, owner_row) = if self.assembly_name.is_some() { (14, 1) } else { (7, 1) };
        for i in 0..self.custom_attributes {
            t.coded(&HAS_CUSTOM_ATTRIBUTE, owner_tag, owner_row);
            t.coded(&CUSTOM_ATTRIBUTE_TYPE, 3, i + 1);
            t.blob(attribute_value);
        }

        if let Some(name) = assembly_name {
            t.u32(0x8004);
            for part in [1u16, 0, 0, 0] {
                t.u16(part);
            }
            t.u32(0);
            t.blob(0);
            t.string(name);
            t.string(0);
        }

        for (r, (name, culture, token)) in self.references.iter().zip(&refs) {
            let v = r.version;
            for part in [v.major, v.minor, v.build, v.revision] {
                t.u16(part);
            }
            t.u32(0);
            t.blob(*token);
            t.string(*name);
            t.string(*culture);
            t.blob(0);
        }

        metadata_root(&[
            ("#~", t.out),
            ("#Strings", strings),
            ("#GUID", guids),
            ("#Blob", blobs),
        ])
    }
}

/// A PE32 image with no CLI header, like a native DLL.
pub fn native_pe_bytes() -> io::Result<Vec<u8>> {
    pe_image(false, None)
}

/// Row writer for the `#~` stream; index widths follow the row counts and heap flags.
struct TableWriter {
    out: Vec<u8>,
    rows: [u32; 64],
    wide_strings: bool,
    wide_blobs: bool,
    wide_guids: bool,
}

impl TableWriter {
    fn header(&mut self) {
        let mut heap_sizes = 0u8;
        if self.wide_strings {
            heap_sizes |= 0x01;
        }
        if self.wide_guids {
            heap_sizes |= 0x02;
        }
        if self.wide_blobs {
            heap_sizes |= 0x04;
        }
        let valid = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, rows)| **rows > 0)
            .fold(0u64, |mask, (id, _)| mask | 1 << id);

        self.u32(0);
        self.out.extend_from_slice(&[2, 0, heap_sizes, 1]);
        self.out.extend_from_slice(&valid.to_le_bytes());
        self.out.extend_from_slice(&0u64.to_le_bytes());
        for count in self.rows.into_iter().filter(|rows| *rows > 0) {
            self.u32(count);
        }
    }

    fn u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn sized(&mut self, wide: bool, v: u32) {
        if wide {
            self.u32(v);
        } else {
            self.u16(v as u16);
        }
    }

    fn string(&mut self, idx: u32) {
        self.sized(self.wide_strings, idx);
    }

    fn blob(&mut self, idx: u32) {
        self.sized(self.wide_blobs, idx);
    }

    fn guid(&mut self, idx: u32) {
        self.sized(self.wide_guids, idx);
    }

    fn index(&mut self, table: usize, row: u32) {
        self.sized(self.rows[table] > 0xFFFF, row);
    }

    fn coded(&mut self, index: &CodedIndex, tag: u32, row: u32) {
        let largest = index.targets.iter().map(|t| self.rows[*t]).max().unwrap_or(0);
        let wide = largest >= 1 << (16 - index.tag_bits);
        self.sized(wide, row << index.tag_bits | tag);
    }
}

#[derive(Default)]
struct StringHeapBuilder {
    data: Vec<u8>,
    seen: HashMap<String, u32>,
}

impl StringHeapBuilder {
    fn add(&mut self, s: &str) -> u32 {
        if self.data.is_empty() {
            self.data.push(0);
        }
        if let Some(at) = self.seen.get(s) {
            return *at;
        }
        let at = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.seen.insert(s.to_string(), at);
        at
    }

    fn finish(mut self) -> Vec<u8> {
        if self.data.is_empty() {
            self.data.push(0);
        }
        self.data
    }
}

#[derive(Default)]
struct BlobHeapBuilder {
    data: Vec<u8>,
}

impl BlobHeapBuilder {
    /// Append a blob (shorter than 128 bytes); empty blobs map to index 0.
    fn add(&mut self, bytes: &[u8]) -> u32 {
        if self.data.is_empty() {
            self.data.push(0);
        }
        if bytes.is_empty() {
            return 0;
        }
        let at = self.data.len() as u32;
        self.data.push(bytes.len() as u8);
        self.data.extend_from_slice(bytes);
        at
    }

    fn finish(mut self) -> Vec<u8> {
        if self.data.is_empty() {
            self.data.push(0);
        }
        self.data
    }
}

fn metadata_root(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let version = b"v4.0.30319\0\0";
    let mut header = Vec::new();
    header.extend_from_slice(b"BSJB");
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&(version.len() as u32).to_le_bytes());
    header.extend_from_slice(version);
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(&(streams.len() as u16).to_le_bytes());

    let headers_len: usize =
        streams.iter().map(|(name, _)| 8 + align4(name.len() + 1)).sum::<usize>();
    let mut offset = header.len() + headers_len;
    let mut body = Vec::new();
    for (name, data) in streams {
        let padded = align4(data.len());
        header.extend_from_slice(&(offset as u32).to_le_bytes());
        header.extend_from_slice(&(padded as u32).to_le_bytes());
        header.extend_from_slice(name.as_bytes());
        header.resize(header.len() + align4(name.len() + 1) - name.len(), 0);
        body.extend_from_slice(data);
        body.resize(body.len() + padded - data.len(), 0);
        offset += padded;
    }
    header.extend_from_slice(&body);
    header
}

/// CLI header followed by the metadata root, for a `.text` section at `text_rva`.
fn cli_text(text_rva: u32, metadata: &[u8]) -> Vec<u8> {
    let mut text = Vec::with_capacity(CLI_HEADER_LEN + metadata.len());
    text.extend_from_slice(&(CLI_HEADER_LEN as u32).to_le_bytes());
    text.extend_from_slice(&2u16.to_le_bytes());
    text.extend_from_slice(&5u16.to_le_bytes());
    text.extend_from_slice(&(text_rva + CLI_HEADER_LEN as u32).to_le_bytes());
    text.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    text.extend_from_slice(&COMIMAGE_FLAGS_ILONLY.to_le_bytes());
    text.resize(CLI_HEADER_LEN, 0);
    text.extend_from_slice(metadata);
    text
}

/// Lay out a one-section DLL. With `metadata`, data directory 14 points at a
/// CLI header at the start of `.text`; without, `.text` holds a bare `ret`.
fn pe_image(is_64: bool, metadata: Option<&[u8]>) -> io::Result<Vec<u8>> {
    let text_len = metadata.map_or(16, |m| CLI_HEADER_LEN + m.len());

    let mut out: Vec<u8> = Vec::new();
    let mut writer = Writer::new(is_64, SECTION_ALIGNMENT, FILE_ALIGNMENT, &mut out);
    writer.reserve_dos_header_and_stub();
    writer.reserve_nt_headers(pe::IMAGE_NUMBEROF_DIRECTORY_ENTRIES);
    writer.reserve_section_headers(1);
    let text_range = writer.reserve_text_section(text_len as u32);

    let text = match metadata {
        Some(metadata) => {
            writer.set_data_directory(
                pe::IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR,
                text_range.virtual_address,
                CLI_HEADER_LEN as u32,
            );
            cli_text(text_range.virtual_address, metadata)
        }
        None => vec![0xC3; text_len],
    };

    let (machine, characteristics, image_base) = if is_64 {
        (
            pe::IMAGE_FILE_MACHINE_AMD64,
            pe::IMAGE_FILE_EXECUTABLE_IMAGE | pe::IMAGE_FILE_LARGE_ADDRESS_AWARE | pe::IMAGE_FILE_DLL,
            0x1_8000_0000,
        )
    } else {
        (
            pe::IMAGE_FILE_MACHINE_I386,
            pe::IMAGE_FILE_EXECUTABLE_IMAGE | pe::IMAGE_FILE_32BIT_MACHINE | pe::IMAGE_FILE_DLL,
            0x0040_0000,
        )
    };

    writer.write_dos_header_and_stub().map_err(io::Error::other)?;
    writer.write_nt_headers(NtHeaders {
        machine,
        time_date_stamp: 0,
        characteristics,
        major_linker_version: 8,
        minor_linker_version: 0,
        address_of_entry_point: 0,
        image_base,
        major_operating_system_version: 4,
        minor_operating_system_version: 0,
        major_image_version: 0,
        minor_image_version: 0,
        major_subsystem_version: 4,
        minor_subsystem_version: 0,
        subsystem: pe::IMAGE_SUBSYSTEM_WINDOWS_CUI,
        dll_characteristics: pe::IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE
            | pe::IMAGE_DLLCHARACTERISTICS_NX_COMPAT
            | pe::IMAGE_DLLCHARACTERISTICS_NO_SEH,
        size_of_stack_reserve: 0x10_0000,
        size_of_stack_commit: 0x1000,
        size_of_heap_reserve: 0x10_0000,
        size_of_heap_commit: 0x1000,
    });
    writer.write_section_headers();
    writer.write_section(text_range.file_offset, &text);

    Ok(out)
}

fn align4(n: usize) -> usize {
    n.div_ceil(4) * 4
}
