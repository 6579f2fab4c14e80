use ndfft_core::{
    conjugate, crop_or_pad, take_dispatch_traces, Array, Complex64, Cpu, CpuConfig, Device, Shape,
    MAX_TRACES,
};

#[test]
fn every_dispatch_is_recorded() {
    let _ = take_dispatch_traces();

    let device = Device::cpu_with(&CpuConfig::default().with_num_threads(2)).unwrap();
    let x = Array::<f32, 3, Cpu>::arange("signal", [4, 3, 2]).unwrap();
    crop_or_pad(&device, &x, Shape::from([2, 5, 2])).unwrap();
    let z = Array::<Complex64, 1, Cpu>::zeros("spectrum", [8]).unwrap();
    conjugate(&device, &z).unwrap();

    let traces = take_dispatch_traces();
    assert_eq!(traces.len(), 2);

    let pad = &traces[0];
    assert_eq!(pad.operation, "crop_or_pad");
    assert_eq!(pad.backend, "cpu");
    assert_eq!(pad.dtype, "f32");
    assert_eq!(pad.label, "signal");
    assert_eq!(pad.rank, 3);
    assert_eq!(pad.input_shape, vec![4, 3, 2]);
    assert_eq!(pad.output_shape, vec![2, 5, 2]);
    assert_eq!(pad.copied_elements, 2 * 3 * 2);
    assert_eq!(pad.parallel_rank, 3);
    assert_eq!(pad.tile, vec![4, 4, 4]);
    assert!(pad.to_json_line().contains("\"label\":\"signal\""));

    let conj = &traces[1];
    assert_eq!(conj.operation, "conjugate");
    assert_eq!(conj.dtype, "c128");
    assert_ne!(conj.operation_id, pad.operation_id);

    assert!(take_dispatch_traces().is_empty());

    // An undrained log stops growing at its capacity and keeps the newest.
    let small = Array::<u8, 1, Cpu>::zeros("tiny", [2]).unwrap();
    for _ in 0..MAX_TRACES + 25 {
        crop_or_pad(&device, &small, Shape::from([3])).unwrap();
    }
    let last = Array::<u8, 1, Cpu>::zeros("last", [2]).unwrap();
    crop_or_pad(&device, &last, Shape::from([1])).unwrap();

    let traces = take_dispatch_traces();
    assert_eq!(traces.len(), MAX_TRACES);
    assert_eq!(traces.last().unwrap().label, "last");
}
