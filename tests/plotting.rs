use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use astroplot::model::{Figure, FigureId, LegendOptions, Limit, Window};
use astroplot::utils::fits_writer::write_fits_image;
use astroplot::{
    extract_data, imshowz, plot_across, set_plot_props, AcrossOptions, AxesSpec, Backend, Band,
    ContrastScale, FillBetween, ImshowOptions, PlotConfig, PlotError, PlotProps, Session, ZScale,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Save(FigureId, PathBuf),
    Show(FigureId),
}

#[derive(Clone, Default)]
struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Backend for RecordingBackend {
    fn save(&mut self, figure: &Figure, path: &Path) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Save(figure.id, path.to_path_buf()));
        Ok(())
    }

    fn show(&mut self, figure: &Figure) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(Call::Show(figure.id));
        Ok(())
    }
}

/// Returns fixed limits and counts how often it ran.
struct FixedScale(Arc<Mutex<usize>>);

impl ContrastScale for FixedScale {
    fn limits(&self, _data: &ArrayViewD<f32>) -> (f64, f64) {
        *self.0.lock().unwrap() += 1;
        (-1.0, 1.0)
    }
}

fn recording_session() -> (Session, RecordingBackend) {
    let backend = RecordingBackend::default();
    (Session::new().with_backend(backend.clone()), backend)
}

fn ramp(shape: &[usize]) -> ArrayD<f32> {
    let n: usize = shape.iter().product();
    ArrayD::from_shape_vec(IxDyn(shape), (0..n).map(|v| (v % 997) as f32).collect()).unwrap()
}

#[test]
fn test_default_imshow_uses_zscale_and_full_window() {
    let (mut session, backend) = recording_session();
    let data = ramp(&[100, 200]);

    let out = imshowz(&mut session, &data, &ImshowOptions::default()).unwrap();

    assert_eq!(out.lims, ZScale::default().limits(&data.view()));
    assert_eq!(out.window, Window { x: (0.0, 200.0), y: (0.0, 100.0) });
    assert!(out.marks_xy.is_none() && out.handler.is_none());

    let axes = session.axes(out.axes).unwrap();
    assert_eq!(axes.xlim, Some((0.0, 200.0)));
    assert_eq!(axes.ylim, Some((0.0, 100.0)));
    assert_eq!(backend.calls(), vec![Call::Show(out.figure)]);
}

#[test]
fn test_injected_scale_and_minmax() {
    let runs = Arc::new(Mutex::new(0));
    let (session, _) = recording_session();
    let mut session = session.with_scale(FixedScale(Arc::clone(&runs)));
    let data = ramp(&[10, 10]);

    let out = imshowz(&mut session, &data, &ImshowOptions::default()).unwrap();
    assert_eq!(out.lims, (-1.0, 1.0));

    let opts = ImshowOptions {
        minmax: Some((3.0, 4.0)),
        ..Default::default()
    };
    assert_eq!(imshowz(&mut session, &data, &opts).unwrap().lims, (3.0, 4.0));
    assert_eq!(*runs.lock().unwrap(), 1);
}

#[test]
fn test_save_suppresses_show_unless_forced() {
    let (mut session, backend) = recording_session();
    let (fig, ax) = session.figaxes(AxesSpec::None, true, false).unwrap();

    let save_only = PlotProps {
        save: Some("/tmp/out.png".into()),
        ..Default::default()
    };
    set_plot_props(&mut session, ax, &save_only).unwrap();
    assert_eq!(backend.calls(), vec![Call::Save(fig, "/tmp/out.png".into())]);

    let both = PlotProps {
        show: Some(true),
        ..save_only
    };
    set_plot_props(&mut session, ax, &both).unwrap();
    assert_eq!(
        backend.calls()[1..],
        [Call::Save(fig, "/tmp/out.png".into()), Call::Show(fig)]
    );
}

#[test]
fn test_extent_with_both_limits_conflicts() {
    let (mut session, backend) = recording_session();
    let data = ramp(&[20, 20]);
    let opts = ImshowOptions {
        extent: Some([0.0, 1.0, 0.0, 1.0]),
        xlim: Some(Limit::Upper(10.0)),
        ylim: Some(Limit::Upper(10.0)),
        ..Default::default()
    };
    assert!(matches!(
        imshowz(&mut session, &data, &opts),
        Err(PlotError::ConflictingExtent)
    ));
    assert!(backend.calls().is_empty());
    assert!(session.figure_ids().is_empty());

    let ylim_only = ImshowOptions {
        extent: None,
        ..opts
    };
    assert!(imshowz(&mut session, &data, &ylim_only).is_ok());
}

#[test]
fn test_rotation_errors_and_equivalence() {
    let (mut session, _) = recording_session();
    let data = ramp(&[6, 9]);
    let rotated = |session: &mut Session, rotate: i32| {
        let opts = ImshowOptions {
            rotate,
            minmax: Some((0.0, 1.0)),
            ..Default::default()
        };
        imshowz(session, &data, &opts).map(|out| {
            session.axes(out.axes).unwrap().images().next().unwrap().data.clone()
        })
    };

    assert!(matches!(rotated(&mut session, 45), Err(PlotError::InvalidRotation(45))));
    assert!(matches!(rotated(&mut session, -100), Err(PlotError::InvalidRotation(-100))));

    let quarter = rotated(&mut session, 90).unwrap();
    assert_eq!(quarter.dim(), (9, 6));
    assert_eq!(rotated(&mut session, 450).unwrap(), quarter);
    assert_eq!(rotated(&mut session, -270).unwrap(), quarter);
    assert_eq!(rotated(&mut session, 720).unwrap().dim(), (6, 9));
}

#[test]
fn test_centered_window_never_leaves_data() {
    let (mut session, _) = recording_session();
    let data = ramp(&[100, 200]);
    for (cxy, rad) in [
        ((100.0, 50.0), None),
        ((-500.0, 20.0), Some(40.0)),
        ((190.0, 95.0), Some(1e4)),
        ((0.0, 100.0), None),
    ] {
        let opts = ImshowOptions {
            cxy: Some(cxy),
            plot_rad: rad,
            minmax: Some((0.0, 1.0)),
            ..Default::default()
        };
        let w = imshowz(&mut session, &data, &opts).unwrap().window;
        assert!(0.0 <= w.x.0 && w.x.0 < w.x.1 && w.x.1 <= 200.0, "{:?}", w);
        assert!(0.0 <= w.y.0 && w.y.0 < w.y.1 && w.y.1 <= 100.0, "{:?}", w);
    }
}

#[test]
fn test_cube_cross_section() {
    let (mut session, _) = recording_session();
    let cube = ArrayD::from_shape_fn(IxDyn(&[5, 4, 10]), |ix| {
        (ix[0] * 100 + ix[1] * 10 + ix[2]) as f32
    });
    let opts = AcrossOptions {
        pos: 3.into(),
        ..Default::default()
    };
    let (cut, data) = plot_across(&mut session, &cube, &opts).unwrap();

    assert_eq!(cut.shape(), &[5]);
    assert_eq!(
        cut.iter().copied().collect::<Vec<_>>(),
        vec![3.0, 103.0, 203.0, 303.0, 403.0]
    );
    assert_eq!(data, cube);

    let explicit = AcrossOptions {
        pos: vec![Some(0), None].into(),
        ..Default::default()
    };
    assert!(matches!(
        plot_across(&mut session, &cube, &explicit),
        Err(PlotError::DimensionMismatch { pos: 2, ndim: 3 })
    ));
}

#[test]
fn test_reads_plain_and_gzip_fits() {
    let tmp = tempfile::tempdir().unwrap();
    let data = ramp(&[12, 7]);
    let plain = tmp.path().join("frame.fits");
    write_fits_image(&data, &plain, &[("OBJECT", "M31")]).unwrap();

    let gz = tmp.path().join("frame.fits.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(&std::fs::read(&plain).unwrap()).unwrap();
    encoder.finish().unwrap();

    for path in [&plain, &gz] {
        let read = extract_data(path.into(), None).unwrap();
        assert_eq!(read, data);
        let read = extract_data(path.into(), Some(0)).unwrap();
        assert_eq!(read.shape(), &[12, 7]);
    }

    assert!(matches!(
        extract_data((&plain).into(), Some(3)),
        Err(PlotError::NoData(msg)) if msg == "for HDU 3"
    ));
}

#[test]
fn test_reads_fits_inside_zip() {
    let tmp = tempfile::tempdir().unwrap();
    let data = ramp(&[9, 11]);
    let fits = tmp.path().join("frame.fits");
    write_fits_image(&data, &fits, &[]).unwrap();

    let archive = tmp.path().join("night.zip");
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    zip.start_file("readme.txt", options).unwrap();
    zip.write_all(b"not a frame").unwrap();
    zip.start_file("raw/frame.fits", options).unwrap();
    zip.write_all(&std::fs::read(&fits).unwrap()).unwrap();
    zip.finish().unwrap();

    assert_eq!(extract_data((&archive).into(), None).unwrap(), data);
}

fn quiet() -> PlotProps {
    PlotProps {
        show: Some(false),
        ..Default::default()
    }
}

#[test]
fn test_plotters_backend_writes_png_and_svg() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::with_config(PlotConfig {
        preview_dir: Some(tmp.path().join("previews")),
        ..Default::default()
    });

    let image = imshowz(
        &mut session,
        &ramp(&[30, 40]),
        &ImshowOptions {
            colorbar: true,
            props: quiet(),
            ..Default::default()
        },
    )
    .unwrap();

    let cube = ramp(&[5, 4, 10]);
    let opts = AcrossOptions {
        label: Some("flux".into()),
        props: PlotProps {
            legend: Some(LegendOptions::default()),
            fill_between: Some(FillBetween {
                bottom: Some(Band::Scalar(0.0)),
                top: Some(Band::Series(vec![1.0, 2.0, 3.0, 2.0, 1.0])),
                ylabel: Some("noise".into()),
                ..Default::default()
            }),
            ..quiet()
        },
        ..Default::default()
    };
    plot_across(&mut session, &cube, &opts).unwrap();
    let cut = session.current_figure().unwrap();
    assert!(session.axes(session.current_axes().unwrap()).unwrap().twin.is_some());

    let size = session.config().figure_size();
    for fig in [image.figure, cut] {
        let png = tmp.path().join(format!("fig{}.png", fig.0));
        let svg = tmp.path().join(format!("fig{}.svg", fig.0));
        session.save(fig, &png).unwrap();
        session.save(fig, &svg).unwrap();

        let img = image::open(&png).unwrap();
        assert_eq!((img.width(), img.height()), size);
        assert!(std::fs::read_to_string(&svg).unwrap().contains("<svg"));
    }
}

#[test]
fn test_show_writes_preview_file() {
    let tmp = tempfile::tempdir().unwrap();
    let previews = tmp.path().join("previews");
    let mut session = Session::with_config(PlotConfig {
        preview_dir: Some(previews.clone()),
        ..Default::default()
    });

    imshowz(&mut session, &ramp(&[20, 20]), &ImshowOptions::default()).unwrap();

    let written: Vec<PathBuf> = std::fs::read_dir(&previews)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(image::open(&written[0]).is_ok());
}

#[test]
fn test_imshow_from_file_exports_stretched_png() {
    let tmp = tempfile::tempdir().unwrap();
    let fits = tmp.path().join("field.fits");
    write_fits_image(&ramp(&[16, 24]), &fits, &[]).unwrap();
    let png = tmp.path().join("field.png");

    let (mut session, backend) = recording_session();
    let opts = ImshowOptions {
        export: Some(png.clone()),
        props: PlotProps {
            save: Some(tmp.path().join("figure.png")),
            close: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let out = imshowz(&mut session, &fits, &opts).unwrap();

    let img = image::open(&png).unwrap();
    assert_eq!((img.width(), img.height()), (24, 16));
    assert_eq!(backend.calls().len(), 1);
    assert!(session.figure(out.figure).is_none());
}

#[test]
fn test_sessions_are_independent() {
    let (mut a, _) = recording_session();
    let (mut b, _) = recording_session();
    a.figaxes(AxesSpec::Number(3), false, false).unwrap();
    assert!(b.figure(FigureId(3)).is_none());
    assert!(matches!(
        b.figaxes(AxesSpec::Figure(FigureId(3)), false, false),
        Err(PlotError::UnrecognizedAxesSpec(_))
    ));
}
