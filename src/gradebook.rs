use crate::curve::CurveModel;
use crate::error::GradeError;
use crate::source::DataSource;
use crate::stats::StatsContainer;

/// What a render listener is being asked to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Histogram,
    Statistics,
}

type RenderListener = Box<dyn FnMut(RenderTarget)>;

/// Pulls data from a source, refreshes the curve histogram and the
/// statistics, and tells registered listeners to redraw.
///
/// Listeners fire only after a refresh succeeded.
pub struct Gradebook {
    curve: CurveModel,
    stats: StatsContainer,
    listeners: Vec<RenderListener>,
}

impl Gradebook {
    pub fn new() -> Self {
        Self {
            curve: CurveModel::new(),
            stats: StatsContainer::new(),
            listeners: Vec::new(),
        }
    }

    pub fn on_render<F>(&mut self, listener: F)
    where
        F: FnMut(RenderTarget) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn curve(&self) -> &CurveModel {
        &self.curve
    }

    pub fn curve_mut(&mut self) -> &mut CurveModel {
        &mut self.curve
    }

    pub fn stats(&self) -> &StatsContainer {
        &self.stats
    }

    pub fn refresh_histogram<D>(&mut self, source: &D) -> Result<(), GradeError>
    where
        D: DataSource + ?Sized,
    {
        let students = source.students()?;
        let tree = source.assignment_tree()?;
        self.curve.refresh(&students, source, &tree)?;
        self.render(RenderTarget::Histogram);
        Ok(())
    }

    pub fn refresh_stats<D>(&mut self, source: &D) -> Result<(), GradeError>
    where
        D: DataSource + ?Sized,
    {
        let students = source.students()?;
        let tree = source.assignment_tree()?;
        self.stats.refresh(tree.iterate(), &students, source)?;
        self.render(RenderTarget::Statistics);
        Ok(())
    }

    fn render(&mut self, target: RenderTarget) {
        for listener in &mut self.listeners {
            listener(target);
        }
    }
}
