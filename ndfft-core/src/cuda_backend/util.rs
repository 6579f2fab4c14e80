use std::{fs, path::PathBuf};

use cudarc::{
    driver::LaunchConfig,
    nvrtc::{CompileOptions, Ptx},
};

use super::error::CudaError;
use crate::{tiling::CopyRegion, DType, Result};

const MIN_BLOCK: usize = 32;
const MAX_BLOCK: usize = 1024;

pub(crate) fn cuda_include_dir() -> Option<PathBuf> {
    // NOTE: same search order as cudarc's build.rs.
    let env_vars = [
        "CUDA_PATH",
        "CUDA_ROOT",
        "CUDA_TOOLKIT_ROOT_DIR",
        "CUDNN_LIB",
    ];
    let env_vars = env_vars
        .into_iter()
        .map(std::env::var)
        .filter_map(std::result::Result::ok)
        .map(Into::<PathBuf>::into);

    let roots = [
        "/usr",
        "/usr/local/cuda",
        "/opt/cuda",
        "/usr/lib/cuda",
        "C:/Program Files/NVIDIA GPU Computing Toolkit",
        "C:/CUDA",
    ];
    let roots = roots.into_iter().map(Into::<PathBuf>::into);

    env_vars
        .chain(roots)
        .find(|path| path.join("include").join("cuda.h").is_file())
}

pub(crate) fn compile_ptx(module_name: &str, source: String) -> Result<Ptx> {
    let include_paths = cuda_include_dir()
        .map(|dir| vec![dir.join("include").display().to_string()])
        .unwrap_or_default();
    let ptx = cudarc::nvrtc::compile_ptx_with_opts(
        source,
        // No hardcoded architecture so the PTX can JIT to the current device
        CompileOptions {
            include_paths,
            ..Default::default()
        },
    )
    .map_err(|err| CudaError::PtxCompileError {
        err,
        module_name: module_name.to_string(),
    })?;
    write_ptx_cache(module_name, &ptx)?;
    Ok(ptx)
}

/// Keep a copy of generated PTX under `~/.cache/ndfft/ptx` for inspection.
fn write_ptx_cache(module_name: &str, ptx: &Ptx) -> Result<()> {
    if let Some(home) = dirs::home_dir() {
        let dir = home.join(".cache").join("ndfft").join("ptx");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{module_name}.ptx")), ptx.to_src())?;
    }
    Ok(())
}

fn preamble<T: DType>() -> String {
    format!(
        r#"
        typedef unsigned char uint8_t;
        typedef unsigned int uint32_t;
        typedef long long int int64_t;
        template <typename T>
        __device__ inline T ndfft_conj(T v) {{ return v; }}
        {}
        "#,
        T::C_DEP.unwrap_or(""),
    )
}

pub(crate) fn copy_kernel_name<T: DType, const R: usize>(region: &CopyRegion<R>) -> String {
    format!(
        "crop_or_pad_{}_r{R}_p{}",
        T::NAME,
        region.parallel_rank()
    )
}

/// Rank-`R` copy kernel. One thread per point of the leading `P` axes,
/// each walking the trailing axes in a loop. `meta` holds the extents,
/// then the source strides, then the destination strides.
pub(crate) fn copy_kernel_source<T: DType, const R: usize>(
    name: &str,
    region: &CopyRegion<R>,
) -> String {
    let p = region.parallel_rank();
    format!(
        r#"{preamble}
        extern "C" __global__ void {name}(
            const {t} *src,
            {t} *dst,
            const unsigned long long *meta,
            const size_t parallel,
            const size_t sequential
        ) {{
            const unsigned long long *ext = meta;
            const unsigned long long *ss = meta + {R};
            const unsigned long long *ds = meta + 2 * {R};
            for (size_t i = (size_t)blockIdx.x * blockDim.x + threadIdx.x; i < parallel;
                i += (size_t)blockDim.x * gridDim.x) {{
                size_t s0 = 0, d0 = 0, rem = i;
                for (int a = {p} - 1; a >= 0; --a) {{
                    size_t c = rem % ext[a];
                    rem /= ext[a];
                    s0 += c * ss[a];
                    d0 += c * ds[a];
                }}
                for (size_t j = 0; j < sequential; ++j) {{
                    size_t s = s0, d = d0, r = j;
                    for (int a = {R} - 1; a >= {p}; --a) {{
                        size_t c = r % ext[a];
                        r /= ext[a];
                        s += c * ss[a];
                        d += c * ds[a];
                    }}
                    dst[d] = src[s];
                }}
            }}
        }}
        "#,
        preamble = preamble::<T>(),
        t = T::C_NAME,
    )
}

pub(crate) fn conjugate_kernel_name<T: DType>() -> String {
    format!("conjugate_{}", T::NAME)
}

pub(crate) fn conjugate_kernel_source<T: DType>(name: &str) -> String {
    format!(
        r#"{preamble}
        extern "C" __global__ void {name}(const {t} *in, {t} *out, const size_t numel) {{
            for (size_t i = (size_t)blockIdx.x * blockDim.x + threadIdx.x; i < numel;
                i += (size_t)blockDim.x * gridDim.x) {{
                out[i] = ndfft_conj(in[i]);
            }}
        }}
        "#,
        preamble = preamble::<T>(),
        t = T::C_NAME,
    )
}

/// A block spans one tile of the parallel axes.
pub(crate) fn copy_launch_config<const R: usize>(region: &CopyRegion<R>) -> LaunchConfig {
    let block: usize = region.tile()[..region.parallel_rank()].iter().product();
    let block = block.clamp(MIN_BLOCK, MAX_BLOCK);
    let grid = region.parallel_count().div_ceil(block).clamp(1, u32::MAX as usize);
    LaunchConfig {
        grid_dim: (grid as u32, 1, 1),
        block_dim: (block as u32, 1, 1),
        shared_mem_bytes: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tiling::contiguous_strides, Complex64, IterationStrategy};

    struct Ceiling(usize);

    impl IterationStrategy for Ceiling {
        fn max_parallel_rank(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn kernel_names_encode_dtype_and_split() {
        let s = contiguous_strides(&[2; 7]);
        let region = Ceiling(8).copy_region([2; 7], s, s);
        assert_eq!(copy_kernel_name::<f32, 7>(&region), "crop_or_pad_f32_r7_p7");
        assert_eq!(conjugate_kernel_name::<Complex64>(), "conjugate_c128");
    }

    #[test]
    fn launch_config_blocks_follow_tiles() {
        let s = contiguous_strides(&[64, 64]);
        let region = Ceiling(8).copy_region([64, 64], s, s);
        let cfg = copy_launch_config(&region);
        assert_eq!(cfg.block_dim.0, 32);
        assert_eq!(cfg.grid_dim.0, 128);
    }

    #[test]
    fn complex_sources_carry_their_struct() {
        let src = conjugate_kernel_source::<Complex64>("conjugate_c128");
        assert!(src.contains("struct ndfft_c128"));
        assert!(src.contains("ndfft_c128 *out"));
    }
}
