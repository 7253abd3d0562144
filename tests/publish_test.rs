use depth_point_cloud::{
    Channel, ColorFrame, DepthIntrinsics, DepthPipeline, FramePublisher, FrameSink, GridSize,
    Output, RawDepthFrame,
};

fn collect(pipeline: &DepthPipeline) -> Vec<Channel> {
    let mut seen = Vec::new();
    let mut sink = |out: Output<'_>| seen.push(out.channel());
    let emitted = pipeline.publish(&mut sink);
    assert_eq!(emitted, seen);
    seen
}

#[test]
fn test_latch_unique_mode() {
    let publisher = FramePublisher::default();
    assert!(publisher.unique());
    assert!(publisher.take_pending().is_empty());

    publisher.mark(Channel::Cloud);
    publisher.mark(Channel::Color);
    assert!(publisher.is_dirty(Channel::Color));
    assert!(!publisher.is_dirty(Channel::Depth));

    assert_eq!(publisher.take_pending(), vec![Channel::Color, Channel::Cloud]);
    assert!(!publisher.is_dirty(Channel::Cloud));
    assert!(publisher.take_pending().is_empty());
}

#[test]
fn test_latch_non_unique_mode() {
    let publisher = FramePublisher::new(false);
    assert_eq!(publisher.take_pending(), Channel::ALL.to_vec());

    publisher.mark(Channel::Depth);
    assert_eq!(publisher.take_pending(), Channel::ALL.to_vec());
    // flags are only consulted in unique mode and survive non-unique publishes
    assert!(publisher.is_dirty(Channel::Depth));

    publisher.set_unique(true);
    assert_eq!(publisher.take_pending(), vec![Channel::Depth]);
}

#[test]
fn test_pipeline_marks_on_callbacks() {
    let grid = GridSize::new(32, 24).unwrap();
    let pipeline = DepthPipeline::new(grid, DepthIntrinsics::default()).unwrap();
    assert!(collect(&pipeline).is_empty());

    let raw = RawDepthFrame::from_vec(grid, vec![700; grid.len()]).unwrap();
    pipeline.on_depth(&raw);
    assert_eq!(collect(&pipeline), vec![Channel::Depth, Channel::Cloud]);
    assert!(collect(&pipeline).is_empty());

    let mut color = ColorFrame::new(grid);
    color.data.fill(200);
    pipeline.on_color(&color);
    pipeline.on_depth(&raw);
    assert_eq!(collect(&pipeline), Channel::ALL.to_vec());

    pipeline.set_unique(false);
    assert_eq!(collect(&pipeline), Channel::ALL.to_vec());
    assert_eq!(collect(&pipeline), Channel::ALL.to_vec());
}

#[test]
fn test_publish_hands_out_latest_frames() {
    let grid = GridSize::new(16, 8).unwrap();
    let pipeline = DepthPipeline::new(grid, DepthIntrinsics::default()).unwrap();

    let mut color = ColorFrame::new(grid);
    color.data.fill(42);
    color.timestamp = 7;
    pipeline.on_color(&color);
    pipeline.on_depth(&RawDepthFrame::from_vec(grid, vec![100; grid.len()]).unwrap());
    pipeline.on_depth(&RawDepthFrame::from_vec(grid, vec![900; grid.len()]).unwrap());

    let mut checked = 0;
    let mut sink = |out: Output<'_>| {
        match out {
            Output::Color(c) => assert_eq!(*c, color),
            Output::Depth(d) => assert!(d.data.iter().all(|v| *v == 900)),
            Output::Cloud(c) => {
                let z = DepthIntrinsics::default().depth_to_z(900);
                assert!(c.points.iter().all(|p| p.z == -z));
            }
        }
        checked += 1;
    };
    pipeline.publish(&mut sink);
    assert_eq!(checked, 3);
}

#[test]
fn test_mismatched_callbacks_are_dropped() {
    let grid = GridSize::new(16, 8).unwrap();
    let pipeline = DepthPipeline::new(grid, DepthIntrinsics::default()).unwrap();
    pipeline.on_depth(&RawDepthFrame::new(GridSize::new(8, 8).unwrap()));
    pipeline.on_color(&ColorFrame::new(GridSize::new(8, 8).unwrap()));
    assert!(collect(&pipeline).is_empty());
    assert_eq!(pipeline.engine().frames_processed(), 0);
}
