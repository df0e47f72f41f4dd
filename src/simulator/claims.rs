use super::Environment;
use crate::components::{ComponentId, Pending, PendingRequest, Status};
use crate::resource::{Request, ResourceId};
use crate::utils::errors::SimulationError;
use crate::utils::{equivalent_f64, QUANTITY_TOLERANCE};

use super::membership::Placement;

impl Environment {
    /// Request one or more resources.  The component is granted the request
    /// right away when it can be; otherwise it becomes requesting, and
    /// enters the pending list of every requested resource.  Granted or
    /// not, the component is suspended - a granted request continues at
    /// the current time.
    pub fn request(&mut self, component: ComponentId, request: Request) -> Result<(), SimulationError> {
        self.operation = "request";
        self.check_suspendable(component, "request")?;
        let claims = request.merged_claims();
        for claim in claims.iter() {
            let resource = self.resource(claim.resource)?;
            if !(claim.quantity >= 0.0) {
                return Err(SimulationError::InvalidQuantity {
                    resource: resource.name().to_string(),
                    quantity: claim.quantity,
                });
            }
        }
        let deadline = request.deadline.time(self.now);
        if !(deadline >= self.now) {
            return Err(SimulationError::InvalidSchedule {
                component: self.components[component.0].name.clone(),
                time: deadline,
                now: self.now,
            });
        }
        self.withdraw(component)?;
        let detail = claims
            .iter()
            .map(|claim| format!("{} of {}", claim.quantity, self.resources[claim.resource.0].name()))
            .collect::<Vec<String>>()
            .join(", ");
        let target = &mut self.components[component.0];
        target.failed = false;
        if request.mode.is_some() {
            target.mode = request.mode;
        }
        target.pending = Some(Pending::Request(PendingRequest {
            granted: vec![0.0; claims.len()],
            claims,
            greedy: request.greedy,
        }));
        self.record_component("request", component, detail);
        self.pursue_request(component, deadline)
    }

    /// Enters the pending lists, and tries to grant the request.  A request
    /// that is not granted fails at the deadline.
    pub(crate) fn pursue_request(
        &mut self,
        component: ComponentId,
        deadline: f64,
    ) -> Result<(), SimulationError> {
        let claims = match &self.components[component.0].pending {
            Some(Pending::Request(request)) => request.claims.clone(),
            _ => Vec::new(),
        };
        self.components[component.0].status = Status::Requesting;
        for claim in claims.iter() {
            let requesters = self.resources[claim.resource.0].requesters();
            if !self.queues[requesters.0].contains(component) {
                self.place(requesters, component, Placement::Sorted(claim.priority))?;
            }
        }
        if self.try_grant(component)? {
            return Ok(());
        }
        self.schedule(component, deadline, 0.0, false)
    }

    /// Claims what the pending request of a component can get.  An all or
    /// nothing request claims everything once every resource has enough
    /// available.  A greedy request claims what is available, up to the
    /// outstanding quantities.  A complete request is granted.
    fn try_grant(&mut self, component: ComponentId) -> Result<bool, SimulationError> {
        let request = match &self.components[component.0].pending {
            Some(Pending::Request(request)) => request.clone(),
            _ => return Ok(false),
        };
        let mut granted = request.granted.clone();
        let complete = if request.greedy {
            for (index, claim) in request.claims.iter().enumerate() {
                let outstanding = claim.quantity - granted[index];
                let available = self.resources[claim.resource.0]
                    .available_quantity()
                    .max(0.0);
                let quantity = outstanding.min(available);
                if quantity > QUANTITY_TOLERANCE {
                    self.claim(component, claim.resource, quantity)?;
                    granted[index] += quantity;
                }
            }
            request
                .claims
                .iter()
                .zip(granted.iter())
                .all(|(claim, granted)| claim.quantity - granted <= QUANTITY_TOLERANCE)
        } else {
            let ready = request.claims.iter().all(|claim| {
                claim.quantity <= self.resources[claim.resource.0].available_quantity() + QUANTITY_TOLERANCE
            });
            if ready {
                for (index, claim) in request.claims.iter().enumerate() {
                    if claim.quantity > 0.0 {
                        self.claim(component, claim.resource, claim.quantity)?;
                    }
                    granted[index] = claim.quantity;
                }
            }
            ready
        };
        if complete {
            self.grant(component)?;
        } else if let Some(Pending::Request(pending)) = &mut self.components[component.0].pending {
            pending.granted = granted;
        }
        Ok(complete)
    }

    fn grant(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.leave_requesters(component);
        self.components[component.0].pending = None;
        self.schedule(component, self.now, 0.0, false)?;
        self.components[component.0].status = Status::Scheduled;
        self.record_component("request honor", component, String::new());
        Ok(())
    }

    /// Leaves the pending lists of the requested resources, keeping the
    /// request.  Returns the requested resources.
    pub(crate) fn leave_requesters(&mut self, component: ComponentId) -> Vec<ResourceId> {
        let resources: Vec<ResourceId> = match &self.components[component.0].pending {
            Some(Pending::Request(request)) => request.claims.iter().map(|claim| claim.resource).collect(),
            _ => Vec::new(),
        };
        resources.iter().for_each(|resource| {
            let requesters = self.resources[resource.0].requesters();
            self.remove_member(requesters, component);
        });
        resources
    }

    /// Takes back a request - the component leaves the pending lists, and
    /// releases the partial claims of a greedy request.  Only the
    /// bookkeeping is done, so the caller rescans the returned resources
    /// once every claim is back.
    pub(crate) fn retract_request(
        &mut self,
        component: ComponentId,
        request: &PendingRequest,
    ) -> Vec<ResourceId> {
        request
            .claims
            .iter()
            .zip(request.granted.iter())
            .map(|(claim, granted)| {
                let requesters = self.resources[claim.resource.0].requesters();
                self.remove_member(requesters, component);
                if *granted > QUANTITY_TOLERANCE {
                    self.unclaim(component, claim.resource, *granted);
                }
                claim.resource
            })
            .collect()
    }

    /// The deadline of a request fired before the grant.
    pub(crate) fn fail_request(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        if let Some(Pending::Request(request)) = self.components[component.0].pending.take() {
            let resources = self.retract_request(component, &request);
            self.components[component.0].failed = true;
            self.record_component("request fail", component, String::new());
            self.rescan_all(resources)?;
        }
        Ok(())
    }

    fn claim(
        &mut self,
        component: ComponentId,
        resource: ResourceId,
        quantity: f64,
    ) -> Result<(), SimulationError> {
        let now = self.now;
        let target = &mut self.resources[resource.0];
        target.claimed += quantity;
        target.tally(now);
        if target.is_anonymous() {
            return Ok(());
        }
        let claimers = target.claimers();
        *self.components[component.0]
            .claims
            .entry(resource)
            .or_insert(0.0) += quantity;
        if !self.queues[claimers.0].contains(component) {
            self.place(claimers, component, Placement::Tail)?;
        }
        Ok(())
    }

    fn unclaim(&mut self, component: ComponentId, resource: ResourceId, quantity: f64) {
        let now = self.now;
        let target = &mut self.resources[resource.0];
        target.claimed -= quantity;
        if equivalent_f64(target.claimed, 0.0) {
            target.claimed = 0.0;
        }
        target.tally(now);
        if target.is_anonymous() {
            return;
        }
        let claimers = target.claimers();
        let claims = &mut self.components[component.0].claims;
        let remaining = match claims.get_mut(&resource) {
            Some(held) => {
                *held -= quantity;
                *held
            }
            None => 0.0,
        };
        if remaining <= QUANTITY_TOLERANCE {
            claims.remove(&resource);
            self.remove_member(claimers, component);
        }
    }

    /// Grants the pending requests of a resource that can now be granted,
    /// from the head of the pending list.  The scan stops at the first
    /// request that cannot be granted, unless it is a greedy request that
    /// holds part of its claim on the resource.
    pub(crate) fn rescan(&mut self, resource: ResourceId) -> Result<(), SimulationError> {
        let requesters = self.resources[resource.0].requesters();
        let members = self.queues[requesters.0].components();
        for component in members {
            if self.components[component.0].status != Status::Requesting {
                continue;
            }
            if self.try_grant(component)? {
                continue;
            }
            let partial = match &self.components[component.0].pending {
                Some(Pending::Request(request)) => {
                    request.greedy
                        && request
                            .claims
                            .iter()
                            .zip(request.granted.iter())
                            .any(|(claim, granted)| {
                                claim.resource == resource && *granted > QUANTITY_TOLERANCE
                            })
                }
                _ => false,
            };
            if !partial {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn rescan_all(&mut self, resources: Vec<ResourceId>) -> Result<(), SimulationError> {
        let mut resources = resources;
        resources.sort();
        resources.dedup();
        resources
            .into_iter()
            .try_for_each(|resource| self.rescan(resource))
    }

    /// Release a claim on a resource - the whole claim without a quantity.
    /// Releasing an identified resource the component holds no claim on is
    /// a `ClaimUnderflow`.  For an anonymous resource, the release comes off
    /// the aggregate claimed quantity.
    pub fn release(
        &mut self,
        component: ComponentId,
        resource: ResourceId,
        quantity: Option<f64>,
    ) -> Result<(), SimulationError> {
        self.operation = "release";
        self.check_component(component)?;
        let target = self.resource(resource)?;
        if let Some(quantity) = quantity {
            if !(quantity >= 0.0) {
                return Err(SimulationError::InvalidQuantity {
                    resource: target.name().to_string(),
                    quantity,
                });
            }
        }
        let held = if target.is_anonymous() {
            Some(target.claimed_quantity())
        } else {
            self.components[component.0].claims.get(&resource).copied()
        };
        // An identified resource can only be released by a claimer
        let held = match held {
            Some(held) => held,
            None => {
                return Err(SimulationError::ClaimUnderflow {
                    component: self.components[component.0].name.clone(),
                    resource: target.name().to_string(),
                    quantity: quantity.unwrap_or(0.0),
                    claimed: 0.0,
                })
            }
        };
        let quantity = quantity.unwrap_or(held);
        if quantity > held + QUANTITY_TOLERANCE {
            return Err(SimulationError::ClaimUnderflow {
                component: self.components[component.0].name.clone(),
                resource: target.name().to_string(),
                quantity,
                claimed: held,
            });
        }
        let detail = format!("{} of {}", quantity, target.name());
        self.unclaim(component, resource, quantity.min(held));
        self.record_component("release", component, detail);
        self.rescan(resource)
    }

    /// Release every identified claim of a component.  Every claim is given
    /// back before the pending lists are rescanned.
    pub fn release_all(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.check_component(component)?;
        let claims: Vec<(ResourceId, f64)> = self.components[component.0]
            .claims
            .iter()
            .map(|(resource, quantity)| (*resource, *quantity))
            .collect();
        for (resource, quantity) in claims.iter() {
            self.unclaim(component, *resource, *quantity);
            let detail = format!("{} of {}", quantity, self.resources[resource.0].name());
            self.record_component("release", component, detail);
        }
        self.rescan_all(claims.into_iter().map(|(resource, _)| resource).collect())
    }

    /// Change the capacity of a resource.  Reducing the capacity below the
    /// claimed quantity over-commits the resource until claims are
    /// released.
    pub fn set_capacity(&mut self, resource: ResourceId, capacity: f64) -> Result<(), SimulationError> {
        self.operation = "set_capacity";
        let target = self.resource(resource)?;
        if !(capacity >= 0.0) {
            return Err(SimulationError::InvalidQuantity {
                resource: target.name().to_string(),
                quantity: capacity,
            });
        }
        let now = self.now;
        let target = &mut self.resources[resource.0];
        target.capacity = capacity;
        target.tally(now);
        let subject = target.name().to_string();
        self.record("capacity", subject, capacity.to_string());
        self.rescan(resource)
    }

    pub fn claimed_quantity(
        &self,
        component: ComponentId,
        resource: ResourceId,
    ) -> Result<f64, SimulationError> {
        self.resource(resource)?;
        Ok(self
            .component(component)?
            .claims
            .get(&resource)
            .copied()
            .unwrap_or(0.0))
    }

    pub fn claimed_resources(&self, component: ComponentId) -> Result<Vec<ResourceId>, SimulationError> {
        Ok(self.component(component)?.claims.keys().copied().collect())
    }
}
