use log::debug;

/// Color format of the offscreen pattern target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8Unorm;

/// The texture the main pass draws into and the post pass reads from.
///
/// `generation` bumps on every reallocation so readers holding bind groups
/// over the old view know to rebuild them.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: [u32; 2],
    generation: u64,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let size = [size[0].max(1), size[1].max(1)];
        let (texture, view) = create_texture(device, size);
        Self {
            texture,
            view,
            size,
            generation: 0,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if the texture was reallocated.
    pub fn ensure_size(&mut self, device: &wgpu::Device, size: [u32; 2]) -> bool {
        let size = [size[0].max(1), size[1].max(1)];
        if size == self.size {
            return false;
        }

        let (texture, view) = create_texture(device, size);
        self.texture = texture;
        self.view = view;
        self.size = size;
        self.generation += 1;
        debug!("offscreen target reallocated at {}x{}", size[0], size[1]);
        true
    }
}

fn create_texture(
    device: &wgpu::Device,
    size: [u32; 2],
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("shadertext-offscreen"),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
