use ndfft_core::{
    conjugate, crop_or_pad, get_modified_shape, is_crop_or_pad_needed, take_dispatch_traces, Array,
    Complex64, Cpu, CpuConfig, Device, Shape,
};

fn main() -> ndfft_core::Result<()> {
    let device = Device::cpu_with(&CpuConfig::from_env()?)?;

    let signal = Array::<f64, 1, Cpu>::arange("signal", [8])?;
    let cropped = crop_or_pad(&device, &signal, Shape::from([4]))?;
    dbg!(cropped.to_vec()?);

    let image = Array::<Complex64, 2, Cpu>::full("image", [3, 3], Complex64::new(1.0, 1.0))?;
    let target = get_modified_shape(&image, Shape::from([5]))?;
    if is_crop_or_pad_needed(&image, &target) {
        let padded = crop_or_pad(&device, &image, target)?;
        let conj = conjugate(&device, &padded)?;
        dbg!(conj.extents(), conj.get([4, 2])?, conj.get([0, 0])?);
    }

    for trace in take_dispatch_traces() {
        println!("{}", trace.to_json_line());
    }
    Ok(())
}
