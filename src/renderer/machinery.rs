use std::{
    collections::VecDeque,
    sync::{
        Arc,
        mpsc::{self, Sender},
    },
    thread::{self, JoinHandle},
};

use image::Rgb32FImage;
use log::{debug, error, info};
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    geometry::{ScreenBlock, ScreenSize},
    renderer::{
        Job, LocalRenderHandler, RenderHandler, RenderSettings, RenderTask, Tiler, worker,
    },
    scene::Scene,
};

/// Distributes tiles of queued render tasks between worker threads.
///
/// Tasks are rendered in the order they were added, tiles of a task in the order given
/// by its tiler. Dropping the manager shuts the workers down, tasks that didn't finish
/// by then are aborted.
pub struct RenderManager {
    settings: RenderSettings,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

/// State shared between the manager handle and the worker threads.
pub(crate) struct Shared {
    state: Mutex<ManagerState>,
}

struct ManagerState {
    tasks: VecDeque<Arc<RenderTask>>,
    workers: Vec<WorkerSlot>,
    shutting_down: bool,
}

struct WorkerSlot {
    jobs: Sender<Job>,
    /// Tasks the worker hasn't been told about yet.
    to_notify: Vec<Arc<RenderTask>>,
    /// Task of the tile the worker is working on.
    rendering: Option<Arc<RenderTask>>,
    /// The worker has nothing to do and waits for a job.
    idle: bool,
}

impl RenderManager {
    pub fn new(settings: RenderSettings) -> Self {
        RenderManager {
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(ManagerState {
                    tasks: VecDeque::new(),
                    workers: Vec::new(),
                    shutting_down: false,
                }),
            }),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Creates a manager with one local renderer per available core.
    pub fn with_local_renderers(settings: RenderSettings) -> Result<Self> {
        let manager = RenderManager::new(settings);
        let count = thread::available_parallelism().map_or(1, |n| n.get());
        for _ in 0..count {
            manager.add_renderer(Box::new(LocalRenderHandler::new(settings)))?;
        }
        info!("Started {count} local renderers");
        Ok(manager)
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().workers.len()
    }

    /// Starts a worker thread driving the handler, returns the worker id.
    pub fn add_renderer(&self, handler: Box<dyn RenderHandler>) -> Result<usize> {
        let mut state = self.shared.state.lock();
        if state.shutting_down {
            return Err(Error::ShuttingDown);
        }

        let id = state.workers.len();
        let (sender, receiver) = mpsc::channel();
        let core = if self.settings.pin_threads {
            core_affinity::get_core_ids()
                .filter(|cores| !cores.is_empty())
                .map(|cores| cores[id % cores.len()])
        } else {
            None
        };

        let shared = Arc::clone(&self.shared);
        // The new thread starts by locking the manager state, it waits until the slot exists
        let handle = thread::Builder::new()
            .name(format!("worker{id}"))
            .spawn(move || {
                if let Some(core) = core {
                    core_affinity::set_for_current(core);
                }
                worker::run(id, shared, receiver, handler);
            })?;

        let to_notify = state.tasks.iter().cloned().collect();
        state.workers.push(WorkerSlot {
            jobs: sender,
            to_notify,
            rendering: None,
            idle: false,
        });
        self.threads.lock().push(handle);

        Ok(id)
    }

    /// Queues a task for rendering.
    pub fn add_render_task(&self, task: Arc<RenderTask>) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.shutting_down {
            return Err(Error::ShuttingDown);
        }
        if state.workers.is_empty() {
            return Err(Error::NoRenderers);
        }

        task.start(state.workers.len());
        debug!(
            "Queued render task {}x{} with {} tiles",
            task.resolution().x,
            task.resolution().y,
            task.progress().total
        );

        state.tasks.push_back(Arc::clone(&task));
        for slot in &mut state.workers {
            slot.to_notify.push(Arc::clone(&task));
        }

        for id in 0..state.workers.len() {
            if state.workers[id].idle {
                state.dispatch(id);
            }
        }

        Ok(())
    }

    /// Creates a task rendering the scene's camera view and queues it.
    pub fn start_rendering(
        &self,
        scene: Arc<Scene>,
        resolution: ScreenSize,
        tiler: Box<dyn Tiler>,
    ) -> Result<Arc<RenderTask>> {
        let task = Arc::new(RenderTask::new(scene, resolution, tiler));
        self.add_render_task(Arc::clone(&task))?;
        Ok(task)
    }

    /// Waits for the task to finish and returns its image.
    pub fn end_rendering(&self, task: Arc<RenderTask>) -> Result<Rgb32FImage> {
        task.wait()?;
        Ok(task.take_image())
    }

    /// Stops all workers after their current tile and aborts unfinished tasks.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.shutting_down {
                state.shutting_down = true;
                for slot in &state.workers {
                    let _ = slot.jobs.send(Job::Terminate);
                }
            }
        }

        let threads = std::mem::take(&mut *self.threads.lock());
        for handle in threads {
            if handle.join().is_err() {
                error!("Render worker panicked");
            }
        }

        let remaining = std::mem::take(&mut self.shared.state.lock().tasks);
        for task in remaining {
            task.abort();
        }
    }
}

impl Drop for RenderManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    /// Called by a worker when it is ready for more work.
    /// Records the previous tile as finished and sends the worker its next jobs.
    pub(crate) fn worker_free(&self, id: usize) {
        let mut state = self.state.lock();
        if let Some(task) = state.workers[id].rendering.take() {
            task.tile_rendered();
        }

        if state.shutting_down {
            let _ = state.workers[id].jobs.send(Job::Terminate);
            return;
        }

        state.dispatch(id);
    }

    /// Called by a worker when it stops, records its last tile.
    pub(crate) fn worker_terminated(&self, id: usize) {
        let mut state = self.state.lock();
        if let Some(task) = state.workers[id].rendering.take() {
            task.tile_rendered();
        }
    }
}

impl ManagerState {
    /// Sends pending notifications and the next tile to the worker.
    /// Marks the worker idle if there was nothing to send.
    fn dispatch(&mut self, id: usize) {
        let notifications = std::mem::take(&mut self.workers[id].to_notify);
        let mut sent_anything = !notifications.is_empty();
        for task in notifications {
            self.send(id, Job::NewTask { task });
        }

        if let Some((task, tile)) = self.next_tile(id) {
            self.workers[id].rendering = Some(Arc::clone(&task));
            self.send(id, Job::RenderTile { task, tile });
            sent_anything = true;
        }

        self.workers[id].idle = !sent_anything;
    }

    /// Next tile from the front task, dropping exhausted tasks from the queue.
    fn next_tile(&mut self, worker_id: usize) -> Option<(Arc<RenderTask>, ScreenBlock)> {
        while let Some(task) = self.tasks.front() {
            if let Some(tile) = task.next_tile(worker_id) {
                return Some((Arc::clone(task), tile));
            }
            self.tasks.pop_front();
        }
        None
    }

    fn send(&self, id: usize, job: Job) {
        if self.workers[id].jobs.send(job).is_err() {
            error!("Worker {id} is gone, job dropped");
        }
    }
}
