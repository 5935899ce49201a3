//! Uniform schemas, their CPU-side value cache and the GPU buffer behind it.
//!
//! Every uniform occupies one 16-byte slot regardless of its type. The
//! generated WGSL struct pins each member with `@align(16)` so the shader
//! sees exactly the slot layout [`UniformBlock`] writes.

use std::fmt::Write;

use wgpu::util::DeviceExt;

pub const SLOT_SIZE: usize = std::mem::size_of::<[f32; 4]>();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Scalar,
    Vec2,
    Vec3,
    Bool,
}

impl UniformKind {
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformKind::Scalar => "f32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Bool => "u32",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Bool(bool),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Bool(_) => UniformKind::Bool,
        }
    }

    /// Bools are stored as the bit pattern of a `u32` so the shader can
    /// compare them against `0u`.
    pub fn to_slot(&self) -> [f32; 4] {
        match *self {
            UniformValue::Scalar(x) => [x, 0.0, 0.0, 0.0],
            UniformValue::Vec2([x, y]) => [x, y, 0.0, 0.0],
            UniformValue::Vec3([x, y, z]) => [x, y, z, 0.0],
            UniformValue::Bool(b) => {
                [f32::from_bits(u32::from(b)), 0.0, 0.0, 0.0]
            }
        }
    }

    fn from_slot(kind: UniformKind, slot: [f32; 4]) -> Self {
        match kind {
            UniformKind::Scalar => UniformValue::Scalar(slot[0]),
            UniformKind::Vec2 => UniformValue::Vec2([slot[0], slot[1]]),
            UniformKind::Vec3 => {
                UniformValue::Vec3([slot[0], slot[1], slot[2]])
            }
            UniformKind::Bool => UniformValue::Bool(slot[0].to_bits() != 0),
        }
    }
}

/// One entry of a program's uniform schema.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformSpec {
    pub name: &'static str,
    pub kind: UniformKind,
    pub default: UniformValue,
}

impl UniformSpec {
    pub const fn scalar(name: &'static str, default: f32) -> Self {
        Self {
            name,
            kind: UniformKind::Scalar,
            default: UniformValue::Scalar(default),
        }
    }

    pub const fn vec2(name: &'static str, default: [f32; 2]) -> Self {
        Self {
            name,
            kind: UniformKind::Vec2,
            default: UniformValue::Vec2(default),
        }
    }

    pub const fn vec3(name: &'static str, default: [f32; 3]) -> Self {
        Self {
            name,
            kind: UniformKind::Vec3,
            default: UniformValue::Vec3(default),
        }
    }

    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: UniformKind::Bool,
            default: UniformValue::Bool(default),
        }
    }
}

/// The value cache for one program: one slot per schema entry, in schema
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformBlock {
    schema: &'static [UniformSpec],
    slots: Vec<[f32; 4]>,
}

impl UniformBlock {
    pub fn with_defaults(schema: &'static [UniformSpec]) -> Self {
        let slots = schema.iter().map(|spec| spec.default.to_slot()).collect();
        Self { schema, slots }
    }

    pub fn schema(&self) -> &'static [UniformSpec] {
        self.schema
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|spec| spec.name == name)
    }

    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), String> {
        let index = self
            .slot_index(name)
            .ok_or_else(|| format!("unknown uniform '{}'", name))?;

        let expected = self.schema[index].kind;
        if value.kind() != expected {
            return Err(format!(
                "uniform '{}' expects {:?}, got {:?}",
                name,
                expected,
                value.kind()
            ));
        }

        self.slots[index] = value.to_slot();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let index = self.slot_index(name)?;
        Some(UniformValue::from_slot(self.schema[index].kind, self.slots[index]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.slots)
    }

    pub fn byte_len(&self) -> usize {
        self.slots.len() * SLOT_SIZE
    }
}

/// Renders the WGSL struct matching [`UniformBlock`]'s slot layout.
pub fn wgsl_struct(struct_name: &str, schema: &[UniformSpec]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "struct {} {{", struct_name);
    for spec in schema {
        let _ = writeln!(
            out,
            "    @align(16) {}: {},",
            spec.name,
            spec.kind.wgsl_type()
        );
    }
    out.push_str("}\n");
    out
}

/// A uniform buffer bound at group 0, binding 0.
pub struct UniformBuffer {
    buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl UniformBuffer {
    pub fn new(device: &wgpu::Device, label: &str, contents: &[u8]) -> Self {
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            contents.len() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, contents: &[u8]) {
        queue.write_buffer(&self.buffer, 0, contents);
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: [UniformSpec; 4] = [
        UniformSpec::scalar("time", 0.0),
        UniformSpec::vec2("resolution", [1.0, 1.0]),
        UniformSpec::vec3("tint", [0.1, 0.2, 0.3]),
        UniformSpec::boolean("flag", true),
    ];

    #[test]
    fn defaults_fill_one_slot_per_uniform() {
        let block = UniformBlock::with_defaults(&SCHEMA);
        assert_eq!(block.byte_len(), 4 * SLOT_SIZE);
        assert_eq!(block.as_bytes().len(), 64);
        assert_eq!(block.get("tint"), Some(UniformValue::Vec3([0.1, 0.2, 0.3])));
        assert_eq!(block.get("flag"), Some(UniformValue::Bool(true)));
    }

    #[test]
    fn bools_are_written_as_u32_bits() {
        let block = UniformBlock::with_defaults(&SCHEMA);
        let bytes = block.as_bytes();
        let flag = u32::from_ne_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]);
        assert_eq!(flag, 1);
    }

    #[test]
    fn set_checks_name_and_kind() {
        let mut block = UniformBlock::with_defaults(&SCHEMA);

        block.set("time", UniformValue::Scalar(2.5)).unwrap();
        assert_eq!(block.get("time"), Some(UniformValue::Scalar(2.5)));

        let err = block.set("nope", UniformValue::Scalar(1.0)).unwrap_err();
        assert!(err.contains("unknown uniform"));

        let err = block.set("time", UniformValue::Bool(false)).unwrap_err();
        assert!(err.contains("expects Scalar"));
        assert_eq!(block.get("time"), Some(UniformValue::Scalar(2.5)));
    }

    #[test]
    fn wgsl_struct_aligns_every_member() {
        let source = wgsl_struct("Params", &SCHEMA);
        assert_eq!(
            source,
            "struct Params {\n    @align(16) time: f32,\n    \
             @align(16) resolution: vec2<f32>,\n    \
             @align(16) tint: vec3<f32>,\n    \
             @align(16) flag: u32,\n}\n"
        );
    }
}
